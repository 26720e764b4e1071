//! Directional-solidification furnace protocols.

use crate::timeseries::TimeSeries;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct FurnaceProtocol {
    pub name: String,
    pub data_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_1_2: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_1_3: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_1_4: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_pyrometer: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_tp: Option<TimeSeries>,
    pub heaters: Vec<HeaterParameters>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transformers: Vec<TransformerReading>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HeaterParameters {
    pub name: String,
    pub f1: HeaterCoil,
    pub f2: HeaterCoil,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dc_current: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum_current: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<TimeSeries>,
}

impl HeaterParameters {
    pub fn numbered(number: usize) -> Self {
        Self {
            name: format!("heater {number}"),
            ..Self::default()
        }
    }
}

/// One of the two AC feeds of a heater
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeaterCoil {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ac_current: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<TimeSeries>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformerReading {
    pub name: String,
    pub reading: TimeSeries,
}
