//! MOVPE recipe logs.
//!
//! Layout: the first line holds the total step count, the second one duration
//! per step in seconds, the third is unused. Channel blocks follow, four lines
//! each: header code, one value per step, ramps, states. Blocks end at EOF or
//! at the first blank line.

use crate::error::{ParseError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Controller state of a channel during one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    On,
    Off,
    Vent,
}

impl ChannelState {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(ChannelState::On),
            "1" => Some(ChannelState::Off),
            "2" => Some(ChannelState::Vent),
            _ => None,
        }
    }
}

/// One header/value/ramp/state quadruple
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBlock {
    pub code: String,
    /// Already divided by the recipe divisor
    pub values: Vec<f64>,
    pub ramps: Vec<String>,
    pub states: Vec<ChannelState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeLog {
    pub total_steps: usize,
    /// Seconds
    pub durations: Vec<f64>,
    pub blocks: Vec<ChannelBlock>,
}

impl RecipeLog {
    pub fn read(path: &Path, divisor: f64) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, divisor, path)
    }

    /// Parse recipe text; stored values are divided by `divisor`.
    pub fn parse(text: &str, divisor: f64, path: &Path) -> Result<Self> {
        let mut lines = RecipeLines::new(text, path);

        let total_steps = lines
            .tokens("total step count")?
            .first()
            .and_then(|token| token.parse::<usize>().ok())
            .ok_or_else(|| lines.error("first line must start with the total step count"))?;

        let durations = lines
            .tokens("step durations")?
            .iter()
            .map(|token| token.parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| lines.error(format!("bad step duration: {e}")))?;
        if durations.len() < total_steps {
            return Err(lines.error(format!(
                "{} steps declared but only {} durations given",
                total_steps,
                durations.len()
            )));
        }
        let durations = durations[..total_steps].to_vec();

        lines.next_line();

        let mut blocks = Vec::new();
        while let Some(header) = lines.next_line() {
            let header: Vec<&str> = header.split_whitespace().collect();
            let values = lines.next_line().unwrap_or_default();
            let ramps = lines.next_line().unwrap_or_default();
            let states = lines.next_line().unwrap_or_default();
            if header.is_empty()
                || values.trim().is_empty()
                || ramps.trim().is_empty()
                || states.trim().is_empty()
            {
                break;
            }

            let code = header[0].to_string();
            let values = values
                .split_whitespace()
                .map(|token| token.parse::<f64>().map(|v| v / divisor))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| lines.error(format!("bad value in block '{code}': {e}")))?;
            let states = states
                .split_whitespace()
                .map(|token| {
                    ChannelState::from_code(token).ok_or_else(|| {
                        lines.error(format!("unknown state '{token}' in block '{code}'"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            debug!("Recipe block '{}': {} values", code, values.len());

            blocks.push(ChannelBlock {
                code,
                values,
                ramps: ramps.split_whitespace().map(str::to_string).collect(),
                states,
            });
        }

        Ok(Self {
            total_steps,
            durations,
            blocks,
        })
    }
}

struct RecipeLines<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
    path: PathBuf,
}

impl<'a> RecipeLines<'a> {
    fn new(text: &'a str, path: &Path) -> Self {
        Self {
            lines: text.lines(),
            line_number: 0,
            path: path.to_path_buf(),
        }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        let line = self.lines.next()?;
        self.line_number += 1;
        Some(line)
    }

    fn tokens(&mut self, what: &str) -> Result<Vec<&'a str>> {
        match self.next_line() {
            Some(line) => Ok(line.split_whitespace().collect()),
            None => Err(self.error(format!("file ends before the {what}"))),
        }
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        ParseError::invalid_format(
            &self.path,
            format!("line {}: {}", self.line_number, reason.into()),
        )
    }
}
