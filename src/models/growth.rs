//! Growth and deposition runs: steps, sources, sample parameters, environment.

use super::Reference;
use crate::timeseries::TimeSeries;
use serde::Serialize;

/// Names of the three source slots every MOVPE step carries
pub const OXYGEN_LINE: &str = "Oxygen";
pub const FLASH_EVAPORATOR_1: &str = "Flash Evaporator 1";
pub const FLASH_EVAPORATOR_2: &str = "Flash Evaporator 2";

/// One growth or deposition run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunRecord {
    pub name: String,
    pub lab_id: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_file: Option<String>,
    pub steps: Vec<ProcessStep>,
}

/// A 1-indexed step of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessStep {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub step_index: usize,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creates_new_thin_film: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_parameters: Vec<SampleParameters>,
    pub environment: Environment,
}

impl ProcessStep {
    /// Empty MOVPE step: oxygen gas line, two argon-carried flash evaporators
    /// and one sample-parameter slot.
    pub fn movpe(step_index: usize, duration: Option<f64>) -> Self {
        Self {
            name: None,
            step_index,
            duration,
            creates_new_thin_film: None,
            sources: vec![
                Source::new(OXYGEN_LINE, SourceKind::GasLine, None),
                Source::new(FLASH_EVAPORATOR_1, SourceKind::Flash, Some("Argon")),
                Source::new(FLASH_EVAPORATOR_2, SourceKind::Flash, Some("Argon")),
            ],
            sample_parameters: vec![SampleParameters::default()],
            environment: Environment::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    GasLine,
    Flash,
    Laser,
}

#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub name: String,
    pub kind: SourceKind,
    pub vapor_source: VaporSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peristaltic_pump_flux: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Source {
    pub fn new(name: &str, kind: SourceKind, carrier_gas: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            vapor_source: VaporSource {
                carrier_gas: carrier_gas.map(str::to_string),
                ..VaporSource::default()
            },
            peristaltic_pump_flux: None,
            target: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VaporSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_flow_rate: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier_push_flow_rate: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier_purge_flow_rate: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<TimeSeries>,
    /// Metres
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wavelength: Option<f64>,
    /// Hertz
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulses: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SampleParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filament_temperature: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shaft_temperature: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substrate_temperature: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heater: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substrate: Option<Reference>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Environment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle_valve: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uniform_gas_flow_rate: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gas_flow: Vec<GasFlow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GasFlow {
    pub gas: String,
    pub flow_rate: TimeSeries,
}
