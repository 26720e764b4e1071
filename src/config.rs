//! Configuration management and validation.
//!
//! [`ParserConfig`] carries everything the format parsers and the archive
//! writer need: output location and format, overwrite policy, and the
//! format-specific constants (sheet names, divisors, checkpoint schedules).
//! It can be loaded from YAML; absent keys fall back to the defaults.

use crate::constants::{
    DEFAULT_CHECKPOINT_MINUTES, DEFAULT_HEATER_COUNT, DEFAULT_NAMESPACE, DEFAULT_RECIPE_DIVISOR,
    DEFAULT_TIMESTAMP_FORMATS, PLD_PRESSURE_SWITCH_MBAR, sheets,
};
use crate::error::{ParseError, Result};
use crate::sheet::CELL_DATETIME_FORMAT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serialization of output documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

/// Which step of a growth run receives the measured checkpoint series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositionStep {
    /// Always this 1-indexed step
    Fixed(usize),
    /// The step whose index equals the row's `number` field
    RowNumber,
}

/// Worksheet names of the workbook formats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub movpe_growth: String,
    pub constant_parameters: String,
    pub furnace_manual: String,
    pub substrates: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            movpe_growth: sheets::MOVPE_GROWTH.to_string(),
            constant_parameters: sheets::CONSTANT_PARAMETERS.to_string(),
            furnace_manual: sheets::FURNACE_MANUAL.to_string(),
            substrates: sheets::SUBSTRATES.to_string(),
        }
    }
}

/// Main configuration for parsing runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Directory output documents are written to
    pub output_dir: PathBuf,

    /// Upload namespace; part of every stable entry id
    pub namespace: String,

    pub output_format: OutputFormat,

    /// Write records whose lab id already exists instead of skipping them
    pub overwrite: bool,

    /// Recipe logs store values scaled by this factor
    pub recipe_divisor: f64,

    /// Elapsed minutes of the per-checkpoint reading columns
    pub checkpoint_minutes: Vec<f64>,

    pub deposition_step: DepositionStep,

    pub sheets: SheetNames,

    /// Heaters of the directional-solidification furnace
    pub heater_count: usize,

    /// Tried in order when parsing absolute timestamps
    pub timestamp_formats: Vec<String>,

    /// Gauge-1 readings in this range (mbar) are replaced by gauge 2 in PLD logs
    pub pld_pressure_switch_mbar: (f64, f64),
}

impl Default for ParserConfig {
    fn default() -> Self {
        let mut timestamp_formats = vec![CELL_DATETIME_FORMAT.to_string()];
        timestamp_formats.extend(
            DEFAULT_TIMESTAMP_FORMATS
                .iter()
                .filter(|format| **format != CELL_DATETIME_FORMAT)
                .map(|format| format.to_string()),
        );
        Self {
            output_dir: PathBuf::from("."),
            namespace: DEFAULT_NAMESPACE.to_string(),
            output_format: OutputFormat::Json,
            overwrite: false,
            recipe_divisor: DEFAULT_RECIPE_DIVISOR,
            checkpoint_minutes: DEFAULT_CHECKPOINT_MINUTES.to_vec(),
            deposition_step: DepositionStep::Fixed(1),
            sheets: SheetNames::default(),
            heater_count: DEFAULT_HEATER_COUNT,
            timestamp_formats,
            pld_pressure_switch_mbar: PLD_PRESSURE_SWITCH_MBAR,
        }
    }
}

impl ParserConfig {
    /// Load from a YAML file and validate
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: ParserConfig = serde_yaml::from_str(&text)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    /// Overwrite records whose lab id already exists
    pub fn with_overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    pub fn with_recipe_divisor(mut self, divisor: f64) -> Self {
        self.recipe_divisor = divisor;
        self
    }

    pub fn with_checkpoint_minutes(mut self, minutes: Vec<f64>) -> Self {
        self.checkpoint_minutes = minutes;
        self
    }

    pub fn with_deposition_step(mut self, step: DepositionStep) -> Self {
        self.deposition_step = step;
        self
    }

    pub fn with_heater_count(mut self, heater_count: usize) -> Self {
        self.heater_count = heater_count;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(ParseError::configuration("namespace must not be empty"));
        }
        if !self.recipe_divisor.is_finite() || self.recipe_divisor == 0.0 {
            return Err(ParseError::configuration(format!(
                "recipe divisor must be finite and non-zero, got {}",
                self.recipe_divisor
            )));
        }
        if self.checkpoint_minutes.is_empty() {
            return Err(ParseError::configuration("checkpoint schedule is empty"));
        }
        if self
            .checkpoint_minutes
            .windows(2)
            .any(|pair| pair[1] < pair[0])
        {
            return Err(ParseError::configuration(
                "checkpoint schedule must be non-decreasing",
            ));
        }
        if self.deposition_step == DepositionStep::Fixed(0) {
            return Err(ParseError::configuration(
                "deposition step indices start at 1",
            ));
        }
        if self.heater_count == 0 {
            return Err(ParseError::configuration("heater count must be positive"));
        }
        if self.timestamp_formats.is_empty() {
            return Err(ParseError::configuration("no timestamp formats configured"));
        }
        let (low, high) = self.pld_pressure_switch_mbar;
        if !(low <= high) {
            return Err(ParseError::configuration(format!(
                "PLD pressure switch window {low}..={high} mbar is empty"
            )));
        }
        Ok(())
    }
}
