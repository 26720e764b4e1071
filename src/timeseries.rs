//! Time-series construction from sheet data.
//!
//! A [`TimeSeries`] holds up to two independent pairs: the measured
//! `(time, value)` and the commanded `(set_time, set_value)`. Values are
//! tagged with their source [`Unit`] when handed to the builder and converted
//! exactly once, in [`TimeSeriesBuilder::build`].
//!
//! Elapsed time comes from one of three places:
//! - a column already holding relative time ([`elapsed_from_relative`]),
//! - absolute timestamps minus a run-scoped start ([`elapsed_from_timestamps`]),
//! - a fixed checkpoint schedule paired with per-checkpoint reading columns
//!   ([`checkpoint_series`]).

use crate::error::{ParseError, Result};
use crate::resolver::{RowView, repeated_group};
use crate::sheet::{Cell, Sheet};
use crate::units::{Dimension, Unit, convert};
use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::{debug, warn};

/// Equal-length time and value sequences, time non-decreasing
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    time: Vec<f64>,
    value: Vec<f64>,
}

impl Series {
    pub fn new(time: Vec<f64>, value: Vec<f64>) -> Result<Self> {
        if time.len() != value.len() {
            return Err(ParseError::invalid_series(format!(
                "{} time points for {} values",
                time.len(),
                value.len()
            )));
        }
        if time.iter().chain(value.iter()).any(|v| !v.is_finite()) {
            return Err(ParseError::invalid_series("non-finite entry"));
        }
        if let Some(pair) = time.windows(2).find(|pair| pair[1] < pair[0]) {
            return Err(ParseError::invalid_series(format!(
                "time decreases from {} to {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self { time, value })
    }

    /// Build from `(time, value)` pairs, ordered by time.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Result<Self> {
        let mut pairs: Vec<(f64, f64)> = pairs.into_iter().collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (time, value) = pairs.into_iter().unzip();
        Self::new(time, value)
    }

    /// A single point
    pub fn point(time: f64, value: f64) -> Result<Self> {
        Self::new(vec![time], vec![value])
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn value(&self) -> &[f64] {
        &self.value
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Shift every time point by `seconds`.
    pub fn offset(&self, seconds: f64) -> Series {
        Series {
            time: self.time.iter().map(|t| t + seconds).collect(),
            value: self.value.clone(),
        }
    }

    fn convert_values(self, from: Unit, to: Unit) -> Result<Series> {
        let value = self
            .value
            .iter()
            .map(|v| convert(*v, from, to))
            .collect::<Result<Vec<_>>>()?;
        Ok(Series {
            time: self.time,
            value,
        })
    }
}

/// Measured and commanded values of one physical channel
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    unit: Unit,
    measured: Option<Series>,
    set_point: Option<Series>,
}

impl TimeSeries {
    pub fn builder(source: Unit) -> TimeSeriesBuilder {
        TimeSeriesBuilder::new(source)
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn measured(&self) -> Option<&Series> {
        self.measured.as_ref()
    }

    pub fn set_point(&self) -> Option<&Series> {
        self.set_point.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.measured.is_none() && self.set_point.is_none()
    }

    /// Layer `other` on top of this series: each pair present in `other`
    /// replaces the corresponding pair here, absent pairs are kept.
    pub fn merge(self, other: TimeSeries) -> Result<TimeSeries> {
        if self.unit != other.unit {
            return Err(ParseError::UnitMismatch {
                from: other.unit.symbol().to_string(),
                to: self.unit.symbol().to_string(),
            });
        }
        Ok(TimeSeries {
            unit: self.unit,
            measured: other.measured.or(self.measured),
            set_point: other.set_point.or(self.set_point),
        })
    }

    /// Shift the measured pair in time; set-points keep their own schedule.
    pub fn offset_measured(self, seconds: f64) -> TimeSeries {
        TimeSeries {
            measured: self.measured.map(|series| series.offset(seconds)),
            ..self
        }
    }
}

impl Serialize for TimeSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields = 1
            + 2 * usize::from(self.measured.is_some())
            + 2 * usize::from(self.set_point.is_some());
        let mut state = serializer.serialize_struct("TimeSeries", fields)?;
        state.serialize_field("unit", self.unit.symbol())?;
        if let Some(series) = &self.measured {
            state.serialize_field("value", &series.value)?;
            state.serialize_field("time", &series.time)?;
        }
        if let Some(series) = &self.set_point {
            state.serialize_field("set_value", &series.value)?;
            state.serialize_field("set_time", &series.time)?;
        }
        state.end()
    }
}

/// Collects measured and commanded pairs in their source unit
#[derive(Debug, Clone)]
pub struct TimeSeriesBuilder {
    source: Unit,
    measured: Option<Series>,
    set_point: Option<Series>,
}

impl TimeSeriesBuilder {
    pub fn new(source: Unit) -> Self {
        Self {
            source,
            measured: None,
            set_point: None,
        }
    }

    pub fn measured(mut self, series: Series) -> Self {
        self.measured = Some(series);
        self
    }

    pub fn set_point(mut self, series: Series) -> Self {
        self.set_point = Some(series);
        self
    }

    pub fn maybe_measured(mut self, series: Option<Series>) -> Self {
        self.measured = series;
        self
    }

    pub fn maybe_set_point(mut self, series: Option<Series>) -> Self {
        self.set_point = series;
        self
    }

    /// Convert to the canonical unit of the source dimension.
    pub fn build(self) -> Result<TimeSeries> {
        let target = self.source.canonical();
        self.build_as(target)
    }

    /// Convert to `target`, which must share the source dimension.
    pub fn build_as(self, target: Unit) -> Result<TimeSeries> {
        let source = self.source;
        if source.dimension() != target.dimension() {
            return Err(ParseError::UnitMismatch {
                from: source.symbol().to_string(),
                to: target.symbol().to_string(),
            });
        }
        Ok(TimeSeries {
            unit: target,
            measured: self
                .measured
                .map(|series| series.convert_values(source, target))
                .transpose()?,
            set_point: self
                .set_point
                .map(|series| series.convert_values(source, target))
                .transpose()?,
        })
    }
}

/// A single commanded value at `time` seconds.
pub fn set_point(time: f64, value: f64, unit: Unit) -> Result<TimeSeries> {
    TimeSeries::builder(unit)
        .set_point(Series::point(time, value)?)
        .build()
}

fn time_unit_check(unit: Unit) -> Result<()> {
    if unit.dimension() != Dimension::Time {
        return Err(ParseError::UnitMismatch {
            from: unit.symbol().to_string(),
            to: Unit::Second.symbol().to_string(),
        });
    }
    Ok(())
}

/// Elapsed seconds from a column already holding relative time in `unit`.
pub fn elapsed_from_relative(sheet: &Sheet, column: &str, unit: Unit) -> Result<Vec<Option<f64>>> {
    time_unit_check(unit)?;
    Ok(sheet
        .column(column)?
        .iter()
        .map(|cell| cell.as_f64().map(|t| unit.to_canonical(t)))
        .collect())
}

/// Parse a timestamp with the first matching format.
pub fn parse_timestamp(text: &str, formats: &[String]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text.trim(), format).ok())
}

/// Absolute timestamps of a column, unparseable cells left unset
pub fn timestamps(
    sheet: &Sheet,
    column: &str,
    formats: &[String],
) -> Result<Vec<Option<NaiveDateTime>>> {
    Ok(sheet
        .column(column)?
        .iter()
        .map(|cell| match cell {
            Cell::Text(text) => parse_timestamp(text, formats),
            _ => None,
        })
        .collect())
}

/// Elapsed seconds since `start`, or since the first parseable timestamp of
/// the column when no run start is given.
pub fn elapsed_from_timestamps(
    sheet: &Sheet,
    column: &str,
    formats: &[String],
    start: Option<NaiveDateTime>,
) -> Result<(Vec<Option<f64>>, Option<NaiveDateTime>)> {
    let stamps = timestamps(sheet, column, formats)?;
    let start = start.or_else(|| stamps.iter().flatten().next().copied());
    let Some(start) = start else {
        return Err(ParseError::EmptyColumn {
            sheet: sheet.name().to_string(),
            column: column.to_string(),
        });
    };
    let elapsed = stamps
        .iter()
        .map(|stamp| stamp.map(|t| (t - start).num_milliseconds() as f64 / 1000.0))
        .collect();
    Ok((elapsed, Some(start)))
}

/// Measured series of `column` against a precomputed elapsed-time axis.
///
/// Rows where either time or value is blank are dropped from both sides. A
/// column with no readings at all is an `EmptyColumn` error.
pub fn column_series(
    sheet: &Sheet,
    elapsed: &[Option<f64>],
    column: &str,
    unit: Unit,
) -> Result<TimeSeries> {
    let cells = sheet.column(column)?;
    if cells.iter().all(Cell::is_empty) {
        return Err(ParseError::EmptyColumn {
            sheet: sheet.name().to_string(),
            column: column.to_string(),
        });
    }
    let (time, value): (Vec<f64>, Vec<f64>) = elapsed
        .iter()
        .zip(cells.iter())
        .filter_map(|(time, cell)| Some(((*time)?, cell.as_f64()?)))
        .unzip();
    debug!("Column '{}': {} readings", column, value.len());
    TimeSeries::builder(unit)
        .measured(Series::new(time, value)?)
        .build()
}

/// Where checkpoint times come from for a row-scoped series
#[derive(Debug, Clone, Copy)]
pub struct Checkpoints<'a> {
    /// Base name of per-checkpoint time columns, used when present in the sheet
    pub time_column: Option<&'a str>,
    /// Elapsed-time schedule used when no time columns exist
    pub schedule: &'a [f64],
    /// Unit of both the time columns and the schedule
    pub time_unit: Unit,
}

/// Measured series of a repeated reading group (`base`, `base.1`, ...) in one
/// row.
///
/// Returns `Ok(None)` when the sheet has no such group at all and an
/// `EmptyColumn` error when the group exists but holds no readings.
pub fn checkpoint_series(
    row: RowView<'_>,
    value_column: &str,
    unit: Unit,
    checkpoints: &Checkpoints<'_>,
) -> Result<Option<TimeSeries>> {
    time_unit_check(checkpoints.time_unit)?;
    let sheet = row.sheet();
    if !sheet.has_column(value_column) {
        debug!("No '{}' readings in sheet '{}'", value_column, sheet.name());
        return Ok(None);
    }

    let pairs: Vec<(f64, f64)> = match checkpoints.time_column {
        Some(time_column) if sheet.has_column(time_column) => {
            let bases = [time_column, value_column];
            repeated_group(sheet, row.index(), &bases)
                .filter_map(|entry| match entry {
                    Ok(entry) => {
                        let time = entry.cells[0].as_f64()?;
                        let value = entry.cells[1].as_f64()?;
                        Some(Ok((time, value)))
                    }
                    Err(err) => Some(Err(err)),
                })
                .collect::<Result<_>>()?
        }
        _ => {
            let bases = [value_column];
            let readings: Vec<Cell> = repeated_group(sheet, row.index(), &bases)
                .map(|entry| entry.map(|mut entry| entry.cells.remove(0)))
                .collect::<Result<_>>()?;
            if readings.len() > checkpoints.schedule.len() {
                warn!(
                    "'{}' has {} readings but the schedule has {} checkpoints; extra readings ignored",
                    value_column,
                    readings.len(),
                    checkpoints.schedule.len()
                );
            }
            checkpoints
                .schedule
                .iter()
                .zip(readings.iter())
                .filter_map(|(time, cell)| Some((*time, cell.as_f64()?)))
                .collect()
        }
    };

    if pairs.is_empty() {
        return Err(ParseError::EmptyColumn {
            sheet: sheet.name().to_string(),
            column: value_column.to_string(),
        });
    }

    let time_unit = checkpoints.time_unit;
    let series = Series::from_pairs(
        pairs
            .into_iter()
            .map(|(time, value)| (time_unit.to_canonical(time), value)),
    )?;
    TimeSeries::builder(unit).measured(series).build().map(Some)
}
