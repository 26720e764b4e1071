//! Measurements: FTIR spectra and Czochralski sensor logs.

use crate::timeseries::TimeSeries;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct IrTransmission {
    pub name: String,
    pub data_file: String,
    /// `Absorbance` or `Transmittance`
    pub ordinate_type: String,
    pub measured_ordinate: Vec<f64>,
    /// Metres
    pub measured_wavelength: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_datetime: Option<String>,
    pub instrument: InstrumentInfo,
    pub sample: SampleInfo,
    pub optics: OpticsSettings,
    pub acquisition: AcquisitionSettings,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstrumentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SampleInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyst_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_folder_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OpticsSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aperture_setting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beamsplitter_setting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector_setting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_pass_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_pass_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optical_filter_setting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preamplifier_gain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_setting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner_velocity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AcquisitionSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wanted_high_frequency_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wanted_low_frequency_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_scans: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_spectrum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<f64>,
}

/// Sensor readings of a Czochralski puller against a shared time axis
#[derive(Debug, Clone, Default, Serialize)]
pub struct SensorLog {
    pub name: String,
    pub data_file: String,
    pub time_axis: TimeAxis,
    pub sensors: Vec<Sensor>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TimeAxis {
    /// Seconds
    pub elapsed_time: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub timestamp: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sensor {
    pub name: String,
    pub value_log: TimeSeries,
}
