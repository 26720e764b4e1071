//! Parser tests against fixture files written into temporary directories

pub mod furnace_protocols;
pub mod movpe_recipe;
pub mod pld_logs;
pub mod sensor_logs;

use crate::config::ParserConfig;
use crate::lookup::InMemoryIndex;
use crate::models::{Document, EntryData, RunRecord};
use crate::parsers::{ParseContext, ParseOutput, Parser};
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A cell written into a workbook fixture
#[derive(Debug, Clone, Copy)]
pub enum Value {
    Text(&'static str),
    Number(f64),
    Blank,
}

pub use Value::{Blank, Number as N, Text as T};

pub struct SheetFixture<'a> {
    pub name: &'a str,
    pub headers: &'a [&'a str],
    pub rows: Vec<Vec<Value>>,
}

/// Write a workbook with the given sheets.
pub fn write_workbook(path: &Path, sheets: &[SheetFixture<'_>]) {
    let mut workbook = Workbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name).unwrap();
        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet.write_string(0, col as u16, *header).unwrap();
        }
        for (row, values) in sheet.rows.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                let (row, col) = (row as u32 + 1, col as u16);
                match value {
                    Value::Text(text) => {
                        worksheet.write_string(row, col, *text).unwrap();
                    }
                    Value::Number(number) => {
                        worksheet.write_number(row, col, *number).unwrap();
                    }
                    Value::Blank => {}
                }
            }
        }
    }
    workbook.save(path).unwrap();
}

/// Temporary input directory plus the configuration and index parsers see
pub struct Harness {
    pub dir: TempDir,
    pub config: ParserConfig,
    pub index: InMemoryIndex,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = ParserConfig::default().with_output_dir(dir.path().join("out"));
        Self {
            dir,
            config,
            index: InMemoryIndex::new(),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        path
    }

    pub fn parse(&self, parser: &dyn Parser, path: &Path) -> crate::error::Result<ParseOutput> {
        let ctx = ParseContext::new(&self.config, &self.index);
        parser.parse(path, &ctx)
    }
}

pub fn find<'o>(output: &'o ParseOutput, file_name: &str) -> &'o Document {
    output
        .documents
        .iter()
        .find(|document| document.file_name == file_name)
        .unwrap_or_else(|| {
            let names: Vec<&str> = output.documents.iter().map(|d| d.file_name.as_str()).collect();
            panic!("no document {file_name} in {names:?}")
        })
}

pub fn run_of(document: &Document) -> &RunRecord {
    match &document.data {
        EntryData::GrowthRun(run) => run,
        other => panic!("expected a growth run, got {}", other.kind()),
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    let scale = expected.abs().max(1e-300);
    assert!(
        ((actual - expected) / scale).abs() < 1e-9 || (actual - expected).abs() < 1e-12,
        "{actual} != {expected}"
    );
}
