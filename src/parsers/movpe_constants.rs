//! MOVPE constant-parameter workbooks (`Overview` sheet).

use super::{ParseContext, ParseOutput, Parser, display_name};
use crate::config::ParserConfig;
use crate::error::{ParseError, Result};
use crate::models::{ConstantParameters, Document, EntryData};
use crate::resolver::{RowView, require_columns};
use crate::sheet::{SheetOptions, Workbook};
use std::path::Path;
use tracing::{info, warn};

pub const CONSTANT_PARAMETERS_ID: &str = "Constant Parameters ID";

pub struct ConstantParametersParser;

impl Parser for ConstantParametersParser {
    fn name(&self) -> &'static str {
        "movpe-constant-parameters"
    }

    fn patterns(&self) -> &'static [&'static str] {
        &["*.xlsx"]
    }

    fn accepts(&self, path: &Path, config: &ParserConfig) -> bool {
        super::matches_any(self.patterns(), path)
            && Workbook::open(path)
                .map(|workbook| {
                    workbook
                        .sheet_names()
                        .contains(&config.sheets.constant_parameters)
                })
                .unwrap_or(false)
    }

    fn parse(&self, path: &Path, ctx: &ParseContext<'_>) -> Result<ParseOutput> {
        let mut workbook = Workbook::open(path)?;
        let sheet = workbook.read_sheet(
            &ctx.config.sheets.constant_parameters,
            &SheetOptions::default(),
        )?;
        require_columns(&sheet, &[CONSTANT_PARAMETERS_ID])?;

        if sheet.height() > 1 {
            warn!(
                "Only one row expected in sheet '{}' of {}, using the first",
                sheet.name(),
                display_name(path)
            );
        }
        let lab_id = RowView::new(&sheet, 0)
            .text(CONSTANT_PARAMETERS_ID)?
            .ok_or_else(|| ParseError::EmptyColumn {
                sheet: sheet.name().to_string(),
                column: CONSTANT_PARAMETERS_ID.to_string(),
            })?;

        let mut output = ParseOutput::new();
        if !output.tolerate(ctx.ensure_new(&lab_id, "ConstantParameters"))? {
            return Ok(output);
        }

        info!("{}: constant parameters '{}'", display_name(path), lab_id);
        output.push(Document::new(
            ctx.file_name(&format!("{lab_id}_constant_parameters_growth"), None),
            path,
            EntryData::ConstantParameters(ConstantParameters {
                name: format!("{lab_id} constant parameters"),
                lab_id,
                data_file: display_name(path),
            }),
        ));
        Ok(output)
    }
}
