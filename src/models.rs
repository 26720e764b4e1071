//! Core data structures for parsed laboratory records.
//!
//! Every parser produces [`Document`]s: one record tree per logical run,
//! sample or measurement, tagged with its `m_def` section name when
//! serialized. Records only reference each other through [`Reference`].

pub mod characterization;
pub mod growth;
pub mod protocol;
pub mod sample;

use serde::Serialize;
use std::path::PathBuf;

pub use characterization::{
    AcquisitionSettings, InstrumentInfo, IrTransmission, OpticsSettings, SampleInfo, Sensor,
    SensorLog, TimeAxis,
};
pub use growth::{
    Environment, GasFlow, ProcessStep, RunRecord, SampleParameters, Source, SourceKind,
    VaporSource,
};
pub use protocol::{FurnaceProtocol, HeaterCoil, HeaterParameters, TransformerReading};
pub use sample::{
    ConstantParameters, Dopant, ElementalComposition, Substrate, ThinFilm, ThinFilmStack,
};

/// Link to another record, stored as an archive path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_id: Option<String>,
    pub reference: String,
}

/// Record tree carried by a [`Document`]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "m_def")]
pub enum EntryData {
    GrowthRun(RunRecord),
    ThinFilm(ThinFilm),
    ThinFilmStack(ThinFilmStack),
    Substrate(Substrate),
    ConstantParameters(ConstantParameters),
    FurnaceProtocol(FurnaceProtocol),
    SensorLog(SensorLog),
    IrTransmission(IrTransmission),
}

impl EntryData {
    pub fn kind(&self) -> &'static str {
        match self {
            EntryData::GrowthRun(_) => "GrowthRun",
            EntryData::ThinFilm(_) => "ThinFilm",
            EntryData::ThinFilmStack(_) => "ThinFilmStack",
            EntryData::Substrate(_) => "Substrate",
            EntryData::ConstantParameters(_) => "ConstantParameters",
            EntryData::FurnaceProtocol(_) => "FurnaceProtocol",
            EntryData::SensorLog(_) => "SensorLog",
            EntryData::IrTransmission(_) => "IrTransmission",
        }
    }

    /// Lab identifier used for duplicate detection, if the record has one
    pub fn lab_id(&self) -> Option<&str> {
        match self {
            EntryData::GrowthRun(run) => Some(&run.lab_id),
            EntryData::ThinFilm(film) => Some(&film.lab_id),
            EntryData::ThinFilmStack(stack) => Some(&stack.lab_id),
            EntryData::Substrate(substrate) => Some(&substrate.lab_id),
            EntryData::ConstantParameters(parameters) => Some(&parameters.lab_id),
            EntryData::FurnaceProtocol(_)
            | EntryData::SensorLog(_)
            | EntryData::IrTransmission(_) => None,
        }
    }
}

/// One output document, written to `file_name` in the output directory
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub source_file: PathBuf,
    pub data: EntryData,
}

impl Document {
    pub fn new(
        file_name: impl Into<String>,
        source_file: impl Into<PathBuf>,
        data: EntryData,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            source_file: source_file.into(),
            data,
        }
    }

    pub fn lab_id(&self) -> Option<&str> {
        self.data.lab_id()
    }
}

/// Processing statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub files_seen: usize,
    pub files_parsed: usize,
    pub files_failed: usize,
    pub files_unmatched: usize,
    pub documents_written: usize,
    pub documents_skipped: usize,
    pub warnings: usize,
    pub output_path: PathBuf,
    pub processing_time_ms: u128,
}

impl ProcessingStats {
    pub fn has_failures(&self) -> bool {
        self.files_failed > 0
    }
}
