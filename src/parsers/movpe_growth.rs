//! MOVPE growth workbook: one growth run per row of the parameter sheet.
//!
//! Every row yields a thin-film layer, the thin-film stack it belongs to and
//! a one-step growth run. Set points are broadcast onto the step, measured
//! checkpoint readings are layered on top of them.
//!
//! A workbook sitting in a MOVPE run folder next to a recipe log only
//! supplies readings for that run; its row for the run itself is left to
//! the recipe parser.

use super::{ParseContext, ParseOutput, Parser, display_name};
use crate::assembler::StepAssembler;
use crate::channels::{SHEET_MEASURED, SHEET_SETPOINTS};
use crate::config::ParserConfig;
use crate::constants::{RECIPE_FOLDER, methods, sections};
use crate::error::{ParseError, Result, tolerate_empty};
use crate::models::{Document, EntryData, ProcessStep, RunRecord, ThinFilm, ThinFilmStack};
use crate::resolver::{RowView, require_columns};
use crate::sheet::{Sheet, SheetOptions, Workbook};
use crate::timeseries::{Checkpoints, checkpoint_series, parse_timestamp};
use crate::units::Unit;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const SAMPLE_ID: &str = "Sample ID";
pub const SUBSTRATE_ID: &str = "Substrate ID";
pub const NUMBER: &str = "number";
pub const COMMENT: &str = "Comment";
pub const REQUIRED_COLUMNS: [&str; 4] = [SAMPLE_ID, SUBSTRATE_ID, NUMBER, COMMENT];

const DURATION: &str = "Duration";
const DATE: &str = "Date";
const WEEKDAY: &str = "Weekday";

pub struct GrowthWorkbookParser;

impl Parser for GrowthWorkbookParser {
    fn name(&self) -> &'static str {
        "movpe-growth-workbook"
    }

    fn patterns(&self) -> &'static [&'static str] {
        &["*.xlsx"]
    }

    fn accepts(&self, path: &Path, config: &ParserConfig) -> bool {
        super::matches_any(self.patterns(), path)
            && Workbook::open(path)
                .map(|workbook| workbook.sheet_names().contains(&config.sheets.movpe_growth))
                .unwrap_or(false)
    }

    fn parse(&self, path: &Path, ctx: &ParseContext<'_>) -> Result<ParseOutput> {
        let sheet = read_parameter_sheet(path, ctx.config)?;
        require_columns(&sheet, &REQUIRED_COLUMNS)?;

        let recipe_lab_id = recipe_run(path);
        let mut output = ParseOutput::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        for row in 0..sheet.height() {
            let row = RowView::new(&sheet, row);
            let Some(sample_id) = row.text(SAMPLE_ID)? else {
                debug!("Row {} has no sample id, skipped", row.index());
                continue;
            };
            if recipe_lab_id.as_deref() == Some(sample_id.as_str()) {
                debug!("Row {} belongs to the recipe of run '{}'", row.index(), sample_id);
                continue;
            }
            if let Some(first) = seen.get(&sample_id) {
                let repeated = Err(ParseError::DuplicateLogicalId {
                    lab_id: sample_id.clone(),
                    entries: vec![format!("{} row {}", display_name(path), first)],
                });
                output.tolerate(repeated)?;
                continue;
            }
            if !output.tolerate(ctx.ensure_new(&sample_id, "GrowthRun"))? {
                continue;
            }
            seen.insert(sample_id.clone(), row.index());
            parse_row(row, &sample_id, path, ctx, &mut output)?;
        }
        info!(
            "{}: {} documents from {} rows",
            display_name(path),
            output.documents.len(),
            sheet.height()
        );
        Ok(output)
    }
}

/// The configured parameter sheet of a growth workbook
pub fn read_parameter_sheet(path: &Path, config: &ParserConfig) -> Result<Sheet> {
    let mut workbook = Workbook::open(path)?;
    workbook.read_sheet(&config.sheets.movpe_growth, &SheetOptions::default())
}

/// Lab id of the MOVPE run whose folder holds `path` next to a recipe log
fn recipe_run(path: &Path) -> Option<String> {
    let run_dir = path.parent()?;
    let has_recipe = fs::read_dir(run_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().eq_ignore_ascii_case(RECIPE_FOLDER))
        .filter_map(|folder| fs::read_dir(folder.path()).ok())
        .flatten()
        .filter_map(|entry| entry.ok())
        .any(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("rcp"))
        });
    has_recipe.then(|| display_name(run_dir))
}

/// Row of the sheet describing `sample_id`
pub fn find_row<'s>(sheet: &'s Sheet, sample_id: &str) -> Result<Option<RowView<'s>>> {
    for row in 0..sheet.height() {
        let view = RowView::new(sheet, row);
        if view.text(SAMPLE_ID)?.as_deref() == Some(sample_id) {
            return Ok(Some(view));
        }
    }
    Ok(None)
}

fn parse_row(
    row: RowView<'_>,
    sample_id: &str,
    path: &Path,
    ctx: &ParseContext<'_>,
    output: &mut ParseOutput,
) -> Result<()> {
    let layer_file = ctx.file_name(
        &format!("{sample_id}_{}", row.index()),
        Some(sections::THIN_FILM),
    );
    let layer_lab_id = format!("{sample_id}layer");
    let stack_file = ctx.file_name(sample_id, Some(sections::THIN_FILM_STACK));
    let substrate_id = row.text(SUBSTRATE_ID)?;

    let layer = ThinFilm {
        name: format!("{sample_id} layer"),
        lab_id: layer_lab_id.clone(),
    };
    let stack = ThinFilmStack {
        name: format!("{sample_id} stack"),
        lab_id: sample_id.to_string(),
        substrate: substrate_id.as_deref().map(|id| {
            ctx.reference(
                &ctx.file_name(id, Some(sections::SUBSTRATE)),
                Some(id),
            )
        }),
        layers: vec![ctx.reference(&layer_file, Some(&layer_lab_id))],
    };

    let mut step = ProcessStep::movpe(1, row.number(DURATION)?);
    step.name = Some("Deposition".to_string());
    if let Some(parameters) = step.sample_parameters.first_mut() {
        parameters.layer = Some(ctx.reference(&layer_file, Some(&layer_lab_id)));
        parameters.substrate = Some(ctx.reference(&stack_file, Some(sample_id)));
    }

    let mut assembler = StepAssembler::from_steps(vec![step]);
    apply_setpoints(&mut assembler, row)?;
    layer_checkpoints(&mut assembler, row, 1, ctx.config)?;

    let run = RunRecord {
        name: format!("{sample_id} Growth"),
        lab_id: sample_id.to_string(),
        method: methods::MOVPE.to_string(),
        description: Some(describe(row)?),
        datetime: row.text(DATE)?.map(|text| normalize_datetime(&text, ctx.config)),
        end_time: None,
        data_file: Some(display_name(path)),
        recipe_file: None,
        steps: assembler.finish(),
    };

    output.push(Document::new(layer_file, path, EntryData::ThinFilm(layer)));
    output.push(Document::new(stack_file, path, EntryData::ThinFilmStack(stack)));
    output.push(Document::new(
        ctx.file_name(sample_id, Some(sections::GROWTH_MOVPE)),
        path,
        EntryData::GrowthRun(run),
    ));
    Ok(())
}

/// Broadcast every set-point column present in the row.
pub fn apply_setpoints(assembler: &mut StepAssembler, row: RowView<'_>) -> Result<()> {
    for rule in SHEET_SETPOINTS.rules() {
        if let Some(value) = row.number(rule.code)? {
            assembler.apply_values(rule, &[value])?;
        }
    }
    Ok(())
}

/// Layer the row's measured checkpoint readings onto `step_index`.
pub fn layer_checkpoints(
    assembler: &mut StepAssembler,
    row: RowView<'_>,
    step_index: usize,
    config: &ParserConfig,
) -> Result<()> {
    assembler.step_mut(step_index)?;
    for group in SHEET_MEASURED {
        let checkpoints = Checkpoints {
            time_column: Some(group.time_column),
            schedule: &config.checkpoint_minutes,
            time_unit: Unit::Minute,
        };
        let series = tolerate_empty(checkpoint_series(
            row,
            group.value_column,
            group.unit,
            &checkpoints,
        ))?;
        if let Some(Some(series)) = series {
            assembler.layer_measured(step_index, group.target, series)?;
        }
    }
    Ok(())
}

fn describe(row: RowView<'_>) -> Result<String> {
    let mut parts = Vec::new();
    if let Some(weekday) = row.text(WEEKDAY)? {
        parts.push(format!("{weekday}."));
    }
    if let Some(number) = row.text(NUMBER)? {
        parts.push(format!("Sequential number: {number}."));
    }
    if let Some(comment) = row.text(COMMENT)? {
        parts.push(comment);
    }
    Ok(parts.join(" "))
}

/// ISO 8601 rendering of a parseable timestamp, the raw text otherwise
pub fn normalize_datetime(text: &str, config: &ParserConfig) -> String {
    parse_timestamp(text, &config.timestamp_formats)
        .map(|datetime| datetime.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|| text.to_string())
}
