//! Substrate workbooks: one substrate per row of the `Substrates` sheet.

use super::{ParseContext, ParseOutput, Parser, display_name};
use crate::config::ParserConfig;
use crate::constants::sections;
use crate::error::Result;
use crate::models::{Document, Dopant, ElementalComposition, EntryData, Substrate};
use crate::resolver::{RowView, require_columns};
use crate::sheet::{SheetOptions, Workbook};
use std::path::Path;
use tracing::{debug, info};

pub const SUBSTRATE_ID: &str = "Substrate ID";
const DESCRIPTION: &str = "Description";
const ELEMENTS: [&str; 1] = ["Elements"];
const DOPING: [&str; 2] = ["Doping species", "Doping Level"];

pub struct SubstrateParser;

impl Parser for SubstrateParser {
    fn name(&self) -> &'static str {
        "substrate-workbook"
    }

    fn patterns(&self) -> &'static [&'static str] {
        &["*.xlsx"]
    }

    fn accepts(&self, path: &Path, config: &ParserConfig) -> bool {
        super::matches_any(self.patterns(), path)
            && Workbook::open(path)
                .map(|workbook| workbook.sheet_names().contains(&config.sheets.substrates))
                .unwrap_or(false)
    }

    fn parse(&self, path: &Path, ctx: &ParseContext<'_>) -> Result<ParseOutput> {
        let mut workbook = Workbook::open(path)?;
        let sheet = workbook.read_sheet(&ctx.config.sheets.substrates, &SheetOptions::default())?;
        require_columns(&sheet, &[SUBSTRATE_ID])?;

        let mut output = ParseOutput::new();
        for row in 0..sheet.height() {
            let row = RowView::new(&sheet, row);
            let Some(lab_id) = row.text(SUBSTRATE_ID)? else {
                debug!("Row {} has no substrate id, skipped", row.index());
                continue;
            };
            if !output.tolerate(ctx.ensure_new(&lab_id, "Substrate"))? {
                continue;
            }
            let substrate = Substrate {
                name: lab_id.clone(),
                description: row.text(DESCRIPTION)?,
                elemental_composition: composition(row)?,
                dopants: dopants(row)?,
                lab_id,
            };
            output.push(Document::new(
                ctx.file_name(&substrate.lab_id, Some(sections::SUBSTRATE)),
                path,
                EntryData::Substrate(substrate),
            ));
        }
        info!("{}: {} substrates", display_name(path), output.documents.len());
        Ok(output)
    }
}

/// `Elements`, `Elements.1`, ... of the row; blank entries are left out
pub fn composition(row: RowView<'_>) -> Result<Vec<ElementalComposition>> {
    let mut elements = Vec::new();
    for entry in row.repeated(&ELEMENTS) {
        if let Some(element) = entry?.cells[0].as_text() {
            elements.push(ElementalComposition { element });
        }
    }
    Ok(elements)
}

/// `Doping species`/`Doping Level` pairs of the row
pub fn dopants(row: RowView<'_>) -> Result<Vec<Dopant>> {
    let mut dopants = Vec::new();
    for entry in row.repeated(&DOPING) {
        let entry = entry?;
        if let Some(element) = entry.cells[0].as_text() {
            dopants.push(Dopant {
                element,
                doping_level: entry.cells[1].as_f64(),
            });
        }
    }
    Ok(dopants)
}
