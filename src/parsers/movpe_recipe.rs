//! MOVPE recipe logs (`<run>/Software file/*.rcp`).
//!
//! The run folder name is the run's lab id. A growth workbook in the run
//! folder with a row for that lab id contributes the measured checkpoint
//! series of the deposition step.

use super::movpe_growth::{NUMBER, find_row, layer_checkpoints, read_parameter_sheet};
use super::{ParseContext, ParseOutput, Parser, display_name, stem_without};
use crate::assembler::StepAssembler;
use crate::channels::RECIPE_CHANNELS;
use crate::config::{DepositionStep, ParserConfig};
use crate::constants::{RECIPE_FOLDER, methods};
use crate::error::{ParseError, Result};
use crate::models::{Document, EntryData, RunRecord};
use crate::recipe::RecipeLog;
use crate::resolver::RowView;
use crate::sheet::Workbook;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct RecipeParser;

impl Parser for RecipeParser {
    fn name(&self) -> &'static str {
        "movpe-recipe"
    }

    fn patterns(&self) -> &'static [&'static str] {
        &["*/Software file/*.rcp"]
    }

    fn parse(&self, path: &Path, ctx: &ParseContext<'_>) -> Result<ParseOutput> {
        let run_dir = run_directory(path)?;
        let lab_id = display_name(&run_dir);

        let mut output = ParseOutput::new();
        if !output.tolerate(ctx.ensure_new(&lab_id, "GrowthRun"))? {
            return Ok(output);
        }

        let log = RecipeLog::read(path, ctx.config.recipe_divisor)?;
        let mut assembler = StepAssembler::new(log.total_steps, &log.durations)?;
        let mut applied = 0;
        for block in &log.blocks {
            if assembler.apply(block, &RECIPE_CHANNELS)? {
                applied += 1;
            }
        }
        debug!("{} of {} recipe blocks mapped", applied, log.blocks.len());

        if let Some(workbook) = companion_workbook(&run_dir, ctx.config)? {
            let sheet = read_parameter_sheet(&workbook, ctx.config)?;
            match find_row(&sheet, &lab_id)? {
                Some(row) => {
                    let step_index = deposition_step(row, ctx.config, assembler.total_steps())?;
                    info!(
                        "Layering readings of {} onto step {}",
                        display_name(&workbook),
                        step_index
                    );
                    layer_checkpoints(&mut assembler, row, step_index, ctx.config)?;
                }
                None => debug!("{} has no row for '{}'", display_name(&workbook), lab_id),
            }
        }

        let file_name = display_name(path);
        let run = RunRecord {
            name: lab_id.clone(),
            lab_id: lab_id.clone(),
            method: methods::MOVPE.to_string(),
            description: Some(format!("parsed from recipe file '{file_name}'")),
            datetime: None,
            end_time: None,
            data_file: None,
            recipe_file: Some(file_name),
            steps: assembler.finish(),
        };
        info!("{}: {} steps", lab_id, run.steps.len());
        output.push(Document::new(
            ctx.file_name(&stem_without(path, &[".rcp"]), None),
            path,
            EntryData::GrowthRun(run),
        ));
        Ok(output)
    }
}

/// `<run>` of `<run>/Software file/<recipe>.rcp`
fn run_directory(path: &Path) -> Result<PathBuf> {
    path.parent()
        .filter(|folder| {
            folder
                .file_name()
                .is_some_and(|name| name.eq_ignore_ascii_case(RECIPE_FOLDER))
        })
        .and_then(Path::parent)
        .filter(|run| run.file_name().is_some())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            ParseError::invalid_format(
                path,
                format!("recipe logs must sit in a '{RECIPE_FOLDER}' folder inside the run folder"),
            )
        })
}

/// First workbook in `run_dir` (sorted by name) that has the growth sheet
fn companion_workbook(run_dir: &Path, config: &ParserConfig) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(run_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
        })
        .collect();
    candidates.sort();
    for candidate in candidates {
        match Workbook::open(&candidate) {
            Ok(workbook) if workbook.sheet_names().contains(&config.sheets.movpe_growth) => {
                return Ok(Some(candidate));
            }
            Ok(_) => {}
            Err(err) => warn!("Ignoring workbook {}: {}", candidate.display(), err),
        }
    }
    Ok(None)
}

fn deposition_step(row: RowView<'_>, config: &ParserConfig, total: usize) -> Result<usize> {
    match config.deposition_step {
        DepositionStep::Fixed(index) => Ok(index),
        DepositionStep::RowNumber => {
            let number = row.number(NUMBER)?.ok_or_else(|| ParseError::EmptyColumn {
                sheet: row.sheet().name().to_string(),
                column: NUMBER.to_string(),
            })?;
            if number < 1.0 || number.fract() != 0.0 {
                return Err(ParseError::StepIndexOutOfRange {
                    index: number.max(0.0) as usize,
                    total,
                });
            }
            Ok(number as usize)
        }
    }
}
