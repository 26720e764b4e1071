//! Bruker OPUS FTIR spectra (`*.0`).
//!
//! Layout (all little endian):
//!
//! - header: directory offset `u32` at byte 12, block count `u32` at byte 20
//! - directory: 12-byte entries of block type `u32`, length `u32` (in 4-byte
//!   words) and offset `u32`
//! - block type bits: 0-1 complex, 2-3 channel, 4-9 parameter set, 10-16
//!   data kind. Parameter set 0 marks a data array, 1 the data-status
//!   parameters describing the array of the same data kind.
//! - parameter blocks: `NAM\0`, value type `u16`, value length `u16` (in
//!   2-byte words), value; the list ends at `END`.

use super::{ParseContext, ParseOutput, Parser, display_name, stem_without};
use crate::error::{ParseError, Result};
use crate::models::{
    AcquisitionSettings, Document, EntryData, InstrumentInfo, IrTransmission, OpticsSettings,
    SampleInfo,
};
use crate::units::Unit;
use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

const DIRECTORY_OFFSET_AT: u64 = 12;
const BLOCK_COUNT_AT: u64 = 20;
const DIRECTORY_ENTRY_LEN: usize = 12;

const PARAMETER_SET_DATA: u32 = 0;
const PARAMETER_SET_STATUS: u32 = 1;
const DATA_KIND_ABSORBANCE: u32 = 4;
const DATA_KIND_TRANSMITTANCE: u32 = 5;

/// A typed entry of the block directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub type_code: u32,
    /// Bytes
    pub length: usize,
    pub offset: usize,
}

impl BlockInfo {
    pub fn complex(&self) -> u32 {
        self.type_code & 0b11
    }

    pub fn channel(&self) -> u32 {
        (self.type_code >> 2) & 0b11
    }

    pub fn parameter_set(&self) -> u32 {
        (self.type_code >> 4) & 0b11_1111
    }

    pub fn data_kind(&self) -> u32 {
        (self.type_code >> 10) & 0b111_1111
    }

    /// Status block and data array describe the same spectrum
    fn describes(&self, data: &BlockInfo) -> bool {
        self.parameter_set() == PARAMETER_SET_STATUS
            && data.parameter_set() == PARAMETER_SET_DATA
            && self.complex() == data.complex()
            && self.channel() == data.channel()
            && self.data_kind() == data.data_kind()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(f64::from(*v)),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Text(text) => text.trim().parse().ok(),
            ParamValue::Bytes(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            ParamValue::Int(v) => Some(v.to_string()),
            ParamValue::Float(v) => Some(v.to_string()),
            ParamValue::Text(text) if text.is_empty() => None,
            ParamValue::Text(text) => Some(text.clone()),
            ParamValue::Bytes(_) => None,
        }
    }
}

pub type Params = HashMap<String, ParamValue>;

/// One spectrum: data array plus its status parameters
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub data_kind: u32,
    pub status: Params,
    pub y: Vec<f64>,
}

impl Spectrum {
    pub fn label(&self) -> Option<&'static str> {
        match self.data_kind {
            DATA_KIND_ABSORBANCE => Some("Absorbance"),
            DATA_KIND_TRANSMITTANCE => Some("Transmittance"),
            _ => None,
        }
    }

    /// Evenly spaced abscissa from `FXV` to `LXV`
    pub fn x(&self) -> Result<Vec<f64>> {
        let first = self.status_number("FXV")?;
        let last = self.status_number("LXV")?;
        let points = self.y.len();
        Ok(match points {
            0 => Vec::new(),
            1 => vec![first],
            n => (0..n)
                .map(|i| first + (last - first) * i as f64 / (n - 1) as f64)
                .collect(),
        })
    }

    fn status_number(&self, name: &str) -> Result<f64> {
        self.status
            .get(name)
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| ParseError::invalid_series(format!("spectrum has no {name} parameter")))
    }

    /// Abscissa as wavelengths in metres
    pub fn wavelength(&self) -> Result<Vec<f64>> {
        let unit = self
            .status
            .get("DXU")
            .and_then(ParamValue::as_text)
            .unwrap_or_default();
        let x = self.x()?;
        match unit.as_str() {
            "WN" => {
                if x.iter().any(|wavenumber| *wavenumber <= 0.0) {
                    return Err(ParseError::invalid_series("non-positive wavenumber"));
                }
                // 1/cm^-1 is a length in cm
                Ok(x.iter().map(|wavenumber| 1e-2 / wavenumber).collect())
            }
            "WL" | "MI" => Ok(x.iter().map(|um| Unit::Micrometer.to_canonical(*um)).collect()),
            other => Err(ParseError::UnknownUnit {
                symbol: other.to_string(),
            }),
        }
    }

    /// `DAT` (`dd/mm/yyyy`) and `TIM` (`hh:mm:ss.fff (zone)`) as ISO 8601
    pub fn datetime(&self) -> Option<String> {
        let date = self.status.get("DAT")?.as_text()?;
        let time = self.status.get("TIM")?.as_text()?;
        let date = NaiveDate::parse_from_str(date.trim(), "%d/%m/%Y").ok()?;
        let time = NaiveTime::parse_from_str(time.split_whitespace().next()?, "%H:%M:%S%.f").ok()?;
        Some(date.and_time(time).format("%Y-%m-%dT%H:%M:%S").to_string())
    }
}

/// Parsed OPUS file
#[derive(Debug, Clone, Default)]
pub struct OpusFile {
    /// Parameters of every non-status parameter block
    pub params: Params,
    pub spectra: Vec<Spectrum>,
}

impl OpusFile {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes).map_err(|err| match err {
            ParseError::Io(io) => ParseError::invalid_format(path, format!("truncated file: {io}")),
            other => other,
        })
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let directory = read_directory(bytes)?;
        let mut file = OpusFile::default();
        let mut statuses = Vec::new();
        for block in &directory {
            match block.parameter_set() {
                PARAMETER_SET_DATA => {}
                PARAMETER_SET_STATUS => {
                    statuses.push((*block, read_params(block_bytes(bytes, block)?)?))
                }
                _ => {
                    if let Ok(params) = read_params(block_bytes(bytes, block)?) {
                        file.params.extend(params);
                    } else {
                        debug!("Block {:#x} is not a parameter list", block.type_code);
                    }
                }
            }
        }

        for data in directory.iter().filter(|b| b.parameter_set() == PARAMETER_SET_DATA) {
            let Some((_, status)) = statuses.iter().find(|(status, _)| status.describes(data))
            else {
                debug!("Data block {:#x} has no status block", data.type_code);
                continue;
            };
            let points = status
                .get("NPT")
                .and_then(ParamValue::as_f64)
                .map(|npt| npt as usize)
                .ok_or_else(|| ParseError::invalid_series("data status has no NPT"))?;
            let scale = status.get("CSF").and_then(ParamValue::as_f64).unwrap_or(1.0);
            let y = read_floats(block_bytes(bytes, data)?, points)?
                .into_iter()
                .map(|v| f64::from(v) * scale)
                .collect();
            file.spectra.push(Spectrum {
                data_kind: data.data_kind(),
                status: status.clone(),
                y,
            });
        }
        Ok(file)
    }

    /// First absorbance or transmittance spectrum
    pub fn result_spectrum(&self) -> Option<&Spectrum> {
        self.spectra.iter().find(|spectrum| spectrum.label().is_some())
    }

    fn text(&self, name: &str) -> Option<String> {
        self.params.get(name).and_then(ParamValue::as_text)
    }

    fn number(&self, name: &str) -> Option<f64> {
        self.params.get(name).and_then(ParamValue::as_f64)
    }
}

fn read_directory(bytes: &[u8]) -> Result<Vec<BlockInfo>> {
    let mut cursor = Cursor::new(bytes);
    cursor.set_position(DIRECTORY_OFFSET_AT);
    let directory_offset = cursor.read_u32::<LittleEndian>()? as usize;
    cursor.set_position(BLOCK_COUNT_AT);
    let count = cursor.read_u32::<LittleEndian>()? as usize;

    let room = bytes.len().saturating_sub(directory_offset) / DIRECTORY_ENTRY_LEN;
    if count > room {
        return Err(ParseError::invalid_series(format!(
            "directory claims {} blocks but only {} entries fit",
            count, room
        )));
    }

    let mut blocks = Vec::with_capacity(count);
    for entry in 0..count {
        let position = entry
            .checked_mul(DIRECTORY_ENTRY_LEN)
            .and_then(|rel| rel.checked_add(directory_offset))
            .ok_or_else(|| ParseError::invalid_series("directory offset overflows"))?;
        cursor.set_position(position as u64);
        let type_code = cursor.read_u32::<LittleEndian>()?;
        let words = cursor.read_u32::<LittleEndian>()? as usize;
        let offset = cursor.read_u32::<LittleEndian>()? as usize;
        let length = words
            .checked_mul(4)
            .ok_or_else(|| ParseError::invalid_series("block length overflows"))?;
        blocks.push(BlockInfo {
            type_code,
            length,
            offset,
        });
    }
    debug!("OPUS directory at {}: {} blocks", directory_offset, blocks.len());
    Ok(blocks)
}

fn block_bytes<'b>(bytes: &'b [u8], block: &BlockInfo) -> Result<&'b [u8]> {
    bytes
        .get(block.offset..block.offset.saturating_add(block.length))
        .ok_or_else(|| {
            ParseError::invalid_series(format!(
                "block {:#x} runs past the end of the file",
                block.type_code
            ))
        })
}

fn read_params(bytes: &[u8]) -> Result<Params> {
    let mut params = Params::new();
    let mut cursor = Cursor::new(bytes);
    loop {
        let start = cursor.position() as usize;
        let name = bytes
            .get(start..start + 3)
            .ok_or_else(|| ParseError::invalid_series("parameter list without END"))?;
        if !name.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            return Err(ParseError::invalid_series("malformed parameter name"));
        }
        let name = String::from_utf8_lossy(name).into_owned();
        if name == "END" {
            return Ok(params);
        }
        cursor.set_position((start + 4) as u64);
        let value_type = cursor.read_u16::<LittleEndian>()?;
        let value_len = cursor.read_u16::<LittleEndian>()? as usize * 2;
        let value_start = start + 8;
        let raw = bytes
            .get(value_start..value_start + value_len)
            .ok_or_else(|| ParseError::invalid_series(format!("parameter {name} is truncated")))?;
        let mut value_cursor = Cursor::new(raw);
        let value = match value_type {
            0 => ParamValue::Int(value_cursor.read_i32::<LittleEndian>()?),
            1 => ParamValue::Float(value_cursor.read_f64::<LittleEndian>()?),
            2..=4 => {
                let text = raw.split(|b| *b == 0).next().unwrap_or_default();
                ParamValue::Text(String::from_utf8_lossy(text).trim().to_string())
            }
            _ => ParamValue::Bytes(raw.to_vec()),
        };
        params.insert(name, value);
        cursor.set_position((value_start + value_len) as u64);
    }
}

fn read_floats(bytes: &[u8], points: usize) -> Result<Vec<f32>> {
    let available = bytes.len() / 4;
    if points > available {
        return Err(ParseError::invalid_series(format!(
            "{points} points announced, {available} stored"
        )));
    }
    let mut values = vec![0f32; points];
    Cursor::new(bytes).read_f32_into::<LittleEndian>(&mut values)?;
    Ok(values)
}

pub struct OpusParser;

impl Parser for OpusParser {
    fn name(&self) -> &'static str {
        "bruker-opus"
    }

    fn patterns(&self) -> &'static [&'static str] {
        &["*.0"]
    }

    fn parse(&self, path: &Path, ctx: &ParseContext<'_>) -> Result<ParseOutput> {
        let opus = OpusFile::read(path)?;
        let spectrum = opus.result_spectrum().ok_or_else(|| {
            ParseError::invalid_format(path, "no absorbance or transmittance spectrum")
        })?;

        let stem = stem_without(path, &[".0"]);
        let measurement = IrTransmission {
            name: stem.clone(),
            data_file: display_name(path),
            ordinate_type: spectrum.label().unwrap_or_default().to_string(),
            measured_wavelength: spectrum.wavelength()?,
            measured_ordinate: spectrum.y.clone(),
            start_datetime: spectrum.datetime(),
            instrument: InstrumentInfo {
                name: opus.text("INS"),
                serial_number: opus.text("SRN"),
                firmware_version: opus.text("VSN"),
            },
            sample: SampleInfo {
                sample_id: opus.text("SNM"),
                analyst_name: opus.text("CNM"),
                experiment_name: opus.text("EXP"),
                experiment_folder_path: opus.text("XPP"),
            },
            optics: OpticsSettings {
                aperture_setting: opus.text("APT"),
                beamsplitter_setting: opus.text("BMS"),
                measurement_channel: opus.text("CHN"),
                detector_setting: opus.text("DTC"),
                high_pass_filter: opus.text("HPF"),
                low_pass_filter: opus.text("LPF"),
                optical_filter_setting: opus.text("OPF"),
                preamplifier_gain: opus.text("PGN"),
                source_setting: opus.text("SRC"),
                scanner_velocity: opus.text("VEL"),
            },
            acquisition: AcquisitionSettings {
                acquisition_mode: opus.text("AQM"),
                wanted_high_frequency_limit: opus.number("HFW"),
                wanted_low_frequency_limit: opus.number("LFW"),
                sample_scans: opus.number("NSS").map(|scans| scans as i64),
                result_spectrum: opus.text("PLF"),
                resolution: opus.number("RES"),
            },
        };
        info!(
            "{}: {} spectrum with {} points",
            display_name(path),
            measurement.ordinate_type,
            measurement.measured_ordinate.len()
        );

        let mut output = ParseOutput::new();
        output.push(Document::new(
            ctx.file_name(&stem, None),
            path,
            EntryData::IrTransmission(measurement),
        ));
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_type_bit_fields() {
        let block = BlockInfo {
            type_code: (DATA_KIND_ABSORBANCE << 10) | (PARAMETER_SET_STATUS << 4) | (1 << 2) | 1,
            length: 0,
            offset: 0,
        };
        assert_eq!(block.complex(), 1);
        assert_eq!(block.channel(), 1);
        assert_eq!(block.parameter_set(), PARAMETER_SET_STATUS);
        assert_eq!(block.data_kind(), DATA_KIND_ABSORBANCE);
    }

    #[test]
    fn test_wavenumbers_become_metres() {
        let mut status = Params::new();
        status.insert("FXV".into(), ParamValue::Float(4000.0));
        status.insert("LXV".into(), ParamValue::Float(1000.0));
        status.insert("DXU".into(), ParamValue::Text("WN".into()));
        let spectrum = Spectrum {
            data_kind: DATA_KIND_TRANSMITTANCE,
            status,
            y: vec![0.1, 0.2],
        };
        let wavelength = spectrum.wavelength().unwrap();
        assert!((wavelength[0] - 2.5e-6).abs() < 1e-15);
        assert!((wavelength[1] - 1e-5).abs() < 1e-15);
        assert_eq!(spectrum.label(), Some("Transmittance"));
    }

    #[test]
    fn test_unknown_x_unit_is_rejected() {
        let mut status = Params::new();
        status.insert("FXV".into(), ParamValue::Float(1.0));
        status.insert("LXV".into(), ParamValue::Float(2.0));
        status.insert("DXU".into(), ParamValue::Text("PNT".into()));
        let spectrum = Spectrum {
            data_kind: DATA_KIND_ABSORBANCE,
            status,
            y: vec![1.0, 2.0],
        };
        assert!(matches!(spectrum.wavelength(), Err(ParseError::UnknownUnit { .. })));
    }

    #[test]
    fn test_truncated_header_is_an_error() {
        assert!(OpusFile::parse(&[0u8; 8]).is_err());
    }
}
