//! Error handling for instrument file parsing.
//!
//! Structural errors (missing columns, sheets, bad units, out-of-range step
//! indices) abort processing of the whole file. `EmptyColumn` and
//! `DuplicateLogicalId` are recoverable: callers log them and move on.

use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Frame(#[from] polars::error::PolarsError),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required columns in sheet '{sheet}': {}", missing.join(", "))]
    SchemaMismatch { sheet: String, missing: Vec<String> },

    #[error("Worksheet '{sheet}' not found (available: {})", available.join(", "))]
    MissingSheet {
        sheet: String,
        available: Vec<String>,
    },

    #[error("Cannot convert {from} to {to}")]
    UnitMismatch { from: String, to: String },

    #[error("Unknown unit '{symbol}'")]
    UnknownUnit { symbol: String },

    #[error("Column '{column}' in sheet '{sheet}' is empty")]
    EmptyColumn { sheet: String, column: String },

    #[error("Record with lab id '{lab_id}' already exists as {}", entries.join(", "))]
    DuplicateLogicalId { lab_id: String, entries: Vec<String> },

    #[error("Step index {index} out of range: file declares {total} steps")]
    StepIndexOutOfRange { index: usize, total: usize },

    #[error("Invalid format in file: {path} - {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("Invalid time series: {reason}")]
    InvalidSeries { reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Input not found: {path}")]
    InputNotFound { path: PathBuf },
}

impl ParseError {
    pub fn schema_mismatch(sheet: impl Into<String>, missing: Vec<String>) -> Self {
        Self::SchemaMismatch {
            sheet: sheet.into(),
            missing,
        }
    }

    pub fn invalid_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_series(reason: impl Into<String>) -> Self {
        Self::InvalidSeries {
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Errors that degrade to a warning instead of aborting the file
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyColumn { .. } | Self::DuplicateLogicalId { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Downgrade an `EmptyColumn` error to a warning and an unset value.
pub fn tolerate_empty<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ ParseError::EmptyColumn { .. }) => {
            warn!("{}", err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
