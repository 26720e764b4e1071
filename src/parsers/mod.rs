//! Instrument format parsers.
//!
//! Each parser turns one matched input file into zero or more [`Document`]s.
//! Parsing never writes: the processor hands the returned documents to a
//! [`DocumentSink`](crate::writer::DocumentSink) only when the whole file
//! parsed without a structural error.

mod furnace;
pub mod furnace_digital;
pub mod furnace_manual;
pub mod movpe_constants;
pub mod movpe_growth;
pub mod movpe_recipe;
pub mod opus;
pub mod pld;
pub mod sensors;
pub mod substrate;

#[cfg(test)]
pub mod tests;

use crate::config::ParserConfig;
use crate::error::{ParseError, Result};
use crate::lookup::RecordIndex;
use crate::models::{Document, Reference};
use crate::writer::{archive_file_name, reference};
use glob::{MatchOptions, Pattern};
use std::path::Path;
use tracing::{debug, warn};

/// Everything a parser may consult besides its input file
pub struct ParseContext<'a> {
    pub config: &'a ParserConfig,
    pub index: &'a dyn RecordIndex,
}

impl<'a> ParseContext<'a> {
    pub fn new(config: &'a ParserConfig, index: &'a dyn RecordIndex) -> Self {
        Self { config, index }
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Output file name in the configured format
    pub fn file_name(&self, stem: &str, section: Option<&str>) -> String {
        archive_file_name(stem, section, self.config.output_format)
    }

    pub fn reference(&self, file_name: &str, lab_id: Option<&str>) -> Reference {
        reference(self.namespace(), file_name, lab_id)
    }

    /// Fails with `DuplicateLogicalId` when a record of `kind` with `lab_id`
    /// already exists, unless overwriting is enabled.
    pub fn ensure_new(&self, lab_id: &str, kind: &str) -> Result<()> {
        let entries: Vec<String> = self
            .index
            .find_by_lab_id(lab_id)
            .into_iter()
            .filter(|record| record.kind == kind)
            .map(|record| record.file_name)
            .collect();
        if entries.is_empty() {
            return Ok(());
        }
        if self.config.overwrite {
            debug!("Overwriting existing {} '{}'", kind, lab_id);
            return Ok(());
        }
        Err(ParseError::DuplicateLogicalId {
            lab_id: lab_id.to_string(),
            entries,
        })
    }
}

/// Documents produced from one input file
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub documents: Vec<Document>,
    /// Messages of recoverable errors that caused a record to be skipped
    pub skipped: Vec<String>,
}

impl ParseOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, document: Document) {
        self.documents.push(document);
    }

    /// `Ok(true)` on success. A recoverable error is logged, remembered and
    /// turned into `Ok(false)`; any other error is returned.
    pub fn tolerate(&mut self, result: Result<()>) -> Result<bool> {
        match result {
            Ok(()) => Ok(true),
            Err(err) if err.is_recoverable() => {
                warn!("{}", err);
                self.skipped.push(err.to_string());
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

pub trait Parser {
    fn name(&self) -> &'static str;

    /// Glob patterns matched case-insensitively against the whole path
    fn patterns(&self) -> &'static [&'static str];

    /// Whether this parser handles `path`; content checks go here
    fn accepts(&self, path: &Path, _config: &ParserConfig) -> bool {
        matches_any(self.patterns(), path)
    }

    fn parse(&self, path: &Path, ctx: &ParseContext<'_>) -> Result<ParseOutput>;
}

pub(crate) fn matches_any(patterns: &[&str], path: &Path) -> bool {
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    patterns.iter().any(|pattern| match Pattern::new(pattern) {
        Ok(pattern) => pattern.matches_path_with(path, options),
        Err(err) => {
            warn!("Invalid file pattern '{}': {}", pattern, err);
            false
        }
    })
}

/// Ordered parser list; the first parser accepting a file wins
pub struct ParserRegistry {
    parsers: Vec<Box<dyn Parser>>,
}

impl ParserRegistry {
    pub fn empty() -> Self {
        Self { parsers: Vec::new() }
    }

    pub fn register(&mut self, parser: Box<dyn Parser>) {
        self.parsers.push(parser);
    }

    pub fn parsers(&self) -> impl Iterator<Item = &dyn Parser> {
        self.parsers.iter().map(|parser| parser.as_ref())
    }

    pub fn find(&self, path: &Path, config: &ParserConfig) -> Option<&dyn Parser> {
        self.parsers()
            .find(|parser| parser.accepts(path, config))
    }
}

impl Default for ParserRegistry {
    /// All built-in parsers, most specific patterns first
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(movpe_recipe::RecipeParser));
        registry.register(Box::new(furnace_manual::ManualProtocolParser));
        registry.register(Box::new(movpe_growth::GrowthWorkbookParser));
        registry.register(Box::new(movpe_constants::ConstantParametersParser));
        registry.register(Box::new(substrate::SubstrateParser));
        registry.register(Box::new(pld::PldParser));
        registry.register(Box::new(opus::OpusParser));
        registry.register(Box::new(sensors::SensorLogParser));
        registry.register(Box::new(furnace_digital::DigitalProtocolParser));
        registry
    }
}

/// File name without directories, for messages and `data_file` fields
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// File name with `suffix` stripped case-insensitively, or the plain stem
pub(crate) fn stem_without(path: &Path, suffixes: &[&str]) -> String {
    let name = display_name(path);
    for suffix in suffixes {
        let Some(split) = name.len().checked_sub(suffix.len()) else {
            continue;
        };
        if name.is_char_boundary(split) && name[split..].eq_ignore_ascii_case(suffix) {
            return name[..split].to_string();
        }
    }
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or(name)
}
