//! Manually kept directional-solidification protocols (`Sheet1` workbooks).

use super::furnace::{Feed, HeaterChannel, ProtocolLayout, assemble};
use super::{ParseContext, ParseOutput, Parser, display_name, stem_without};
use crate::config::ParserConfig;
use crate::error::Result;
use crate::models::{Document, EntryData};
use crate::resolver::require_columns;
use crate::sheet::{SheetOptions, Workbook};
use crate::timeseries::elapsed_from_timestamps;
use std::path::Path;
use tracing::info;

pub const ENDING_TIME: &str = "Ending time";

const LAYOUT: ProtocolLayout = ProtocolLayout {
    temperature_1_2: "T12",
    temperature_1_3: "T13",
    temperature_1_4: "T14",
    temperature_pyrometer: Some("Tpyr"),
    temperature_tp: Some("Ttp"),
    heater_column,
    transformers: &[],
};

fn heater_column(channel: HeaterChannel, number: usize) -> Option<String> {
    Some(match channel {
        HeaterChannel::AcCurrent(feed) => format!("Iac{number}_{}", feed.label()),
        HeaterChannel::Phase(feed) => format!("phi{number}_{}", feed.label()),
        HeaterChannel::Frequency(feed) => format!("f{number}_{}", feed.label()),
        HeaterChannel::DcCurrent => format!("Iges{number}"),
        HeaterChannel::Power => format!("P{number}"),
        HeaterChannel::Temperature => format!("T{number}"),
        HeaterChannel::SumCurrent => return None,
    })
}

pub struct ManualProtocolParser;

impl Parser for ManualProtocolParser {
    fn name(&self) -> &'static str {
        "ds-manual-protocol"
    }

    fn patterns(&self) -> &'static [&'static str] {
        &["*.xlsx"]
    }

    /// Workbooks whose protocol sheet carries an `Ending time` column
    fn accepts(&self, path: &Path, config: &ParserConfig) -> bool {
        if !super::matches_any(self.patterns(), path) {
            return false;
        }
        let Ok(mut workbook) = Workbook::open(path) else {
            return false;
        };
        if !workbook.sheet_names().contains(&config.sheets.furnace_manual) {
            return false;
        }
        workbook
            .read_sheet(&config.sheets.furnace_manual, &SheetOptions::default())
            .is_ok_and(|sheet| sheet.has_column(ENDING_TIME))
    }

    fn parse(&self, path: &Path, ctx: &ParseContext<'_>) -> Result<ParseOutput> {
        let mut workbook = Workbook::open(path)?;
        let sheet =
            workbook.read_sheet(&ctx.config.sheets.furnace_manual, &SheetOptions::default())?;
        require_columns(&sheet, &[ENDING_TIME])?;

        let (elapsed, start) =
            elapsed_from_timestamps(&sheet, ENDING_TIME, &ctx.config.timestamp_formats, None)?;
        let stem = stem_without(path, &[".xlsx"]);
        let mut protocol = assemble(&sheet, &elapsed, &LAYOUT, ctx.config.heater_count)?;
        protocol.name = stem.clone();
        protocol.data_file = display_name(path);
        protocol.start_time = start.map(|start| start.format("%Y-%m-%dT%H:%M:%S").to_string());

        info!("{}: {} protocol rows", display_name(path), sheet.height());
        let mut output = ParseOutput::new();
        output.push(Document::new(
            ctx.file_name(&stem, None),
            path,
            EntryData::FurnaceProtocol(protocol),
        ));
        Ok(output)
    }
}
