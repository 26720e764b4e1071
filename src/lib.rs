//! growthlog
//!
//! Parsers for crystal-growth and thin-film deposition instrument files.
//! Each supported format is mapped onto ELN archive documents: growth runs
//! with their steps, thin films, substrates, furnace protocols, sensor logs
//! and IR spectra.
//!
//! The library provides:
//! - Spreadsheet and delimited-text readers with header-tolerant column lookup
//! - Unit-aware time series with set-point and measured parts
//! - Step-indexed assembly of growth runs from channel tables
//! - One [`parsers::Parser`] per instrument format, routed by file pattern
//! - Duplicate detection against already written records
//! - Deterministic JSON/YAML archive output

pub mod assembler;
pub mod channels;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod lookup;
pub mod models;
pub mod parsers;
pub mod processor;
pub mod recipe;
pub mod resolver;
pub mod sheet;
pub mod timeseries;
pub mod units;
pub mod writer;

pub use config::{OutputFormat, ParserConfig};
pub use error::{ParseError, Result};
pub use models::{Document, EntryData, ProcessingStats};
pub use processor::Processor;
