//! Column layouts shared by the manual and digital furnace protocols.

use crate::error::{Result, tolerate_empty};
use crate::models::{FurnaceProtocol, HeaterCoil, HeaterParameters};
use crate::sheet::Sheet;
use crate::timeseries::{TimeSeries, column_series};
use crate::units::Unit;
use tracing::debug;

/// AC feed of a heater
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    F1,
    F2,
}

impl Feed {
    pub fn label(self) -> &'static str {
        match self {
            Feed::F1 => "F1",
            Feed::F2 => "F2",
        }
    }
}

/// Per-heater channel of a protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaterChannel {
    AcCurrent(Feed),
    Phase(Feed),
    Frequency(Feed),
    DcCurrent,
    SumCurrent,
    Power,
    Temperature,
}

impl HeaterChannel {
    pub fn unit(self) -> Unit {
        match self {
            HeaterChannel::AcCurrent(_) | HeaterChannel::DcCurrent | HeaterChannel::SumCurrent => {
                Unit::Ampere
            }
            HeaterChannel::Phase(_) => Unit::Degree,
            HeaterChannel::Frequency(_) => Unit::Hertz,
            HeaterChannel::Power => Unit::Watt,
            HeaterChannel::Temperature => Unit::Kelvin,
        }
    }
}

/// Column names of one protocol dialect
pub struct ProtocolLayout {
    pub temperature_1_2: &'static str,
    pub temperature_1_3: &'static str,
    pub temperature_1_4: &'static str,
    pub temperature_pyrometer: Option<&'static str>,
    pub temperature_tp: Option<&'static str>,
    /// Column of a heater channel (heaters numbered from 1), if the dialect logs it
    pub heater_column: fn(HeaterChannel, usize) -> Option<String>,
    /// Dimensionless transformer readings
    pub transformers: &'static [(&'static str, &'static str)],
}

/// Series of `column` if the sheet has it and it holds any reading
pub fn optional_series(
    sheet: &Sheet,
    elapsed: &[Option<f64>],
    column: &str,
    unit: Unit,
) -> Result<Option<TimeSeries>> {
    if !sheet.has_column(column) {
        debug!("No '{}' column in '{}'", column, sheet.name());
        return Ok(None);
    }
    tolerate_empty(column_series(sheet, elapsed, column, unit))
}

/// Fill a protocol from `sheet` against the shared elapsed-time axis.
pub fn assemble(
    sheet: &Sheet,
    elapsed: &[Option<f64>],
    layout: &ProtocolLayout,
    heater_count: usize,
) -> Result<FurnaceProtocol> {
    let optional = |column: Option<&str>| -> Result<Option<TimeSeries>> {
        match column {
            Some(column) => optional_series(sheet, elapsed, column, Unit::Kelvin),
            None => Ok(None),
        }
    };

    let mut protocol = FurnaceProtocol {
        temperature_1_2: optional(Some(layout.temperature_1_2))?,
        temperature_1_3: optional(Some(layout.temperature_1_3))?,
        temperature_1_4: optional(Some(layout.temperature_1_4))?,
        temperature_pyrometer: optional(layout.temperature_pyrometer)?,
        temperature_tp: optional(layout.temperature_tp)?,
        ..FurnaceProtocol::default()
    };

    let heater_series = |channel: HeaterChannel, number: usize| -> Result<Option<TimeSeries>> {
        match (layout.heater_column)(channel, number) {
            Some(column) => optional_series(sheet, elapsed, &column, channel.unit()),
            None => Ok(None),
        }
    };
    let coil = |feed: Feed, number: usize| -> Result<HeaterCoil> {
        Ok(HeaterCoil {
            ac_current: heater_series(HeaterChannel::AcCurrent(feed), number)?,
            phase: heater_series(HeaterChannel::Phase(feed), number)?,
            frequency: heater_series(HeaterChannel::Frequency(feed), number)?,
        })
    };

    for number in 1..=heater_count {
        let heater = HeaterParameters {
            f1: coil(Feed::F1, number)?,
            f2: coil(Feed::F2, number)?,
            dc_current: heater_series(HeaterChannel::DcCurrent, number)?,
            sum_current: heater_series(HeaterChannel::SumCurrent, number)?,
            power: heater_series(HeaterChannel::Power, number)?,
            temperature: heater_series(HeaterChannel::Temperature, number)?,
            ..HeaterParameters::numbered(number)
        };
        protocol.heaters.push(heater);
    }

    for (name, column) in layout.transformers {
        if let Some(reading) = optional_series(sheet, elapsed, column, Unit::Dimensionless)? {
            protocol.transformers.push(crate::models::TransformerReading {
                name: name.to_string(),
                reading,
            });
        }
    }
    Ok(protocol)
}
