//! Processor tests
//!
//! Run the whole pipeline over small lab shares written into temporary
//! directories.

pub mod basic_processing;

use crate::config::ParserConfig;
use crate::parsers::tests::{N, SheetFixture, T, Value, write_workbook};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SENSORS: &str = "time_rel,TE_1_K_bottom_axis\n0,300\n1,301\n";

pub const RECIPE: &str = "2\n10 20\nheader\n3\n10 20\n0 0\n0 0\n";

/// Input share and output directory inside one temporary directory
pub struct Share {
    pub dir: TempDir,
}

impl Share {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn input(&self) -> PathBuf {
        self.dir.path().join("share")
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("archive")
    }

    pub fn config(&self) -> ParserConfig {
        ParserConfig::default()
            .with_output_dir(self.output())
            .with_namespace("upload")
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.input().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// Growth workbook with one row per sample id
    pub fn growth_workbook(
        &self,
        relative: &str,
        headers: &[&str],
        rows: Vec<Vec<Value>>,
    ) -> PathBuf {
        let path = self.input().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        write_workbook(
            &path,
            &[SheetFixture {
                name: "Ti Sr Parameter",
                headers,
                rows,
            }],
        );
        path
    }

    pub fn written(&self) -> Vec<String> {
        written_files(&self.output())
    }
}

pub const GROWTH_HEADERS: &[&str] = &["Sample ID", "Substrate ID", "number", "Comment"];

pub fn growth_row(sample_id: &'static str) -> Vec<Value> {
    vec![T(sample_id), T("SUB-1"), N(1.0), T("")]
}

/// Sorted file names in `dir`, empty when it does not exist
pub fn written_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
