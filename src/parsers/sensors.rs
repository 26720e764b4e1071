//! Czochralski sensor logs written by the multilog tool.
//!
//! A comma-separated table with `#` comment lines: `time_rel` (seconds since
//! start), an optional `time_abs`, and one column per sensor. The sensor's
//! unit is encoded as a token of its column name, e.g. `TE_1_K_bottom_axis`.

use super::{ParseContext, ParseOutput, Parser, display_name, stem_without};
use crate::error::{Result, tolerate_empty};
use crate::models::{Document, EntryData, Sensor, SensorLog, TimeAxis};
use crate::resolver::require_columns;
use crate::sheet::{DelimitedOptions, Sheet, read_delimited};
use crate::timeseries::{column_series, elapsed_from_relative};
use crate::units::Unit;
use std::path::Path;
use tracing::{debug, info};

pub const TIME_RELATIVE: &str = "time_rel";
pub const TIME_ABSOLUTE: &str = "time_abs";

pub struct SensorLogParser;

impl Parser for SensorLogParser {
    fn name(&self) -> &'static str {
        "cz-sensor-log"
    }

    fn patterns(&self) -> &'static [&'static str] {
        &["*_sensors.csv", "*.multilog.csv"]
    }

    fn parse(&self, path: &Path, ctx: &ParseContext<'_>) -> Result<ParseOutput> {
        let options = DelimitedOptions {
            comment_prefix: Some("#".to_string()),
            ..DelimitedOptions::default()
        };
        let sheet = read_delimited(path, &options)?;
        require_columns(&sheet, &[TIME_RELATIVE])?;

        let elapsed = elapsed_from_relative(&sheet, TIME_RELATIVE, Unit::Second)?;
        let time_axis = TimeAxis {
            elapsed_time: elapsed.iter().flatten().copied().collect(),
            timestamp: absolute_times(&sheet)?,
        };

        let mut sensors = Vec::new();
        for column in sheet.column_names() {
            if column == TIME_RELATIVE || column == TIME_ABSOLUTE {
                continue;
            }
            let unit = unit_from_name(&column);
            debug!("Sensor '{}' in {}", column, unit.symbol());
            if let Some(value_log) =
                tolerate_empty(column_series(&sheet, &elapsed, &column, unit))?
            {
                sensors.push(Sensor {
                    name: column,
                    value_log,
                });
            }
        }

        info!("{}: {} sensors", display_name(path), sensors.len());
        let stem = stem_without(path, &[".multilog.csv", "_sensors.csv"]);
        let mut output = ParseOutput::new();
        output.push(Document::new(
            ctx.file_name(&stem, None),
            path,
            EntryData::SensorLog(SensorLog {
                name: stem.clone(),
                data_file: display_name(path),
                time_axis,
                sensors,
            }),
        ));
        Ok(output)
    }
}

fn absolute_times(sheet: &Sheet) -> Result<Vec<String>> {
    if !sheet.has_column(TIME_ABSOLUTE) {
        return Ok(Vec::new());
    }
    Ok(sheet
        .column(TIME_ABSOLUTE)?
        .iter()
        .filter_map(|cell| cell.as_text())
        .collect())
}

/// Unit named by the first non-numeric token after the sensor prefix;
/// dimensionless when no token names a unit.
pub fn unit_from_name(name: &str) -> Unit {
    name.split('_')
        .skip(1)
        .filter(|token| !token.is_empty() && !token.chars().all(|c| c.is_ascii_digit()))
        .find_map(|token| token.parse::<Unit>().ok())
        .filter(|unit| *unit != Unit::Dimensionless)
        .unwrap_or(Unit::Dimensionless)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_token_in_sensor_name() {
        assert_eq!(unit_from_name("TE_1_K_bottom_axis"), Unit::Kelvin);
        assert_eq!(unit_from_name("Pt100_2_degC_crucible"), Unit::DegreeCelsius);
        assert_eq!(unit_from_name("IGA_6_mbar"), Unit::Millibar);
    }

    #[test]
    fn test_sensor_without_unit_token_is_dimensionless() {
        assert_eq!(unit_from_name("heater_state"), Unit::Dimensionless);
        assert_eq!(unit_from_name("flag"), Unit::Dimensionless);
    }
}
