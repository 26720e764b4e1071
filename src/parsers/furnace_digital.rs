//! Digital directional-solidification protocols exported by the furnace
//! control software (`;`-separated, decimal comma).

use super::furnace::{HeaterChannel, ProtocolLayout, assemble};
use super::{ParseContext, ParseOutput, Parser, display_name, stem_without};
use crate::config::ParserConfig;
use crate::error::Result;
use crate::models::{Document, EntryData};
use crate::resolver::require_columns;
use crate::sheet::{DelimitedOptions, read_delimited};
use crate::timeseries::elapsed_from_timestamps;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// The one timestamp column kept; every channel shares its clock
pub const TIME_COLUMN: &str = "T Ist H1 Time";
const VALUE_SUFFIX: &str = "ValueY";

const LAYOUT: ProtocolLayout = ProtocolLayout {
    temperature_1_2: "T12 ValueY",
    temperature_1_3: "T13 ValueY",
    temperature_1_4: "T14 ValueY",
    temperature_pyrometer: None,
    temperature_tp: None,
    heater_column,
    transformers: &[
        ("Trafo 1 P", "Trafo 1 P ValueY"),
        ("Trafo 1 M", "Trafo 1 M ValueY"),
        ("Trafo 2 P", "Trafo 2 P ValueY"),
        ("Trafo 2 M", "Trafo 2 M ValueY"),
    ],
};

fn heater_column(channel: HeaterChannel, number: usize) -> Option<String> {
    Some(match channel {
        HeaterChannel::AcCurrent(feed) => format!("AC_{} H{number} ValueY", feed.label()),
        HeaterChannel::DcCurrent => format!("I DC Ist H{number} ValueY"),
        HeaterChannel::SumCurrent => format!("I Summe H{number} ValueY"),
        HeaterChannel::Power => format!("P Ist H{number} ValueY"),
        HeaterChannel::Temperature => format!("T Ist H{number} ValueY"),
        HeaterChannel::Phase(_) | HeaterChannel::Frequency(_) => return None,
    })
}

/// Header after dropping the per-channel clocks: `/` becomes a space
pub fn normalize_column(name: &str) -> String {
    name.replace('/', " ")
}

fn is_redundant_clock(name: &str) -> bool {
    name.contains("Time") && name != TIME_COLUMN
}

fn header_line(path: &Path) -> Option<String> {
    let mut line = String::new();
    BufReader::new(File::open(path).ok()?)
        .read_line(&mut line)
        .ok()?;
    Some(line)
}

pub struct DigitalProtocolParser;

impl Parser for DigitalProtocolParser {
    fn name(&self) -> &'static str {
        "ds-digital-protocol"
    }

    fn patterns(&self) -> &'static [&'static str] {
        &["*.csv"]
    }

    fn accepts(&self, path: &Path, _config: &ParserConfig) -> bool {
        super::matches_any(self.patterns(), path)
            && header_line(path)
                .is_some_and(|header| header.contains(TIME_COLUMN) && header.contains(VALUE_SUFFIX))
    }

    fn parse(&self, path: &Path, ctx: &ParseContext<'_>) -> Result<ParseOutput> {
        let mut sheet = read_delimited(path, &DelimitedOptions::semicolon_decimal_comma())?;
        let dropped = sheet.drop_columns(is_redundant_clock)?;
        sheet.rename_columns(normalize_column)?;
        debug!("Dropped {} clock columns", dropped);
        require_columns(&sheet, &[TIME_COLUMN])?;

        let (elapsed, start) =
            elapsed_from_timestamps(&sheet, TIME_COLUMN, &ctx.config.timestamp_formats, None)?;
        let stem = stem_without(path, &[".csv"]);
        let mut protocol = assemble(&sheet, &elapsed, &LAYOUT, ctx.config.heater_count)?;
        protocol.name = stem.clone();
        protocol.data_file = display_name(path);
        protocol.start_time = start.map(|start| start.format("%Y-%m-%dT%H:%M:%S").to_string());

        info!(
            "{}: {} rows, {} transformer channels",
            display_name(path),
            sheet.height(),
            protocol.transformers.len()
        );
        let mut output = ParseOutput::new();
        output.push(Document::new(
            ctx.file_name(&stem, None),
            path,
            EntryData::FurnaceProtocol(protocol),
        ));
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_the_reference_clock_survives() {
        assert!(is_redundant_clock("AC_F1 H1 Time"));
        assert!(is_redundant_clock("T12 Time"));
        assert!(!is_redundant_clock(TIME_COLUMN));
        assert!(!is_redundant_clock("T12 ValueY"));
    }

    #[test]
    fn test_slashes_become_spaces() {
        assert_eq!(normalize_column("Trafo 1/P ValueY"), "Trafo 1 P ValueY");
    }

    #[test]
    fn test_digital_heater_columns() {
        use super::super::furnace::Feed;
        assert_eq!(
            heater_column(HeaterChannel::AcCurrent(Feed::F1), 4).as_deref(),
            Some("AC_F1 H4 ValueY")
        );
        assert_eq!(heater_column(HeaterChannel::Frequency(Feed::F1), 4), None);
    }
}
