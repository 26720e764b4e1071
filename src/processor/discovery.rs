//! Input file discovery
//!
//! Inputs may be files or directories. Directories are walked recursively in
//! file-name order so that runs are reproducible; hidden files, office lock
//! files and everything below the output directory are left out.

use crate::error::{ParseError, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// File discovery over a list of input paths
#[derive(Debug)]
pub struct FileDiscovery {
    inputs: Vec<PathBuf>,
    excluded: Option<PathBuf>,
}

impl FileDiscovery {
    pub fn new(inputs: &[PathBuf]) -> Self {
        Self {
            inputs: inputs.to_vec(),
            excluded: None,
        }
    }

    /// Skip `dir` and everything below it
    pub fn excluding(mut self, dir: &Path) -> Self {
        self.excluded = Some(dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf()));
        self
    }

    /// All candidate files, sorted and without duplicates
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let mut files = BTreeSet::new();
        for input in &self.inputs {
            if !input.exists() {
                return Err(ParseError::InputNotFound {
                    path: input.clone(),
                });
            }
            if input.is_file() {
                files.insert(input.clone());
                continue;
            }

            debug!("Walking {}", input.display());
            let walker = WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !self.is_skipped(entry));
            for entry in walker {
                let entry = entry.map_err(|err| match err.into_io_error() {
                    Some(io) => ParseError::Io(io),
                    None => ParseError::invalid_format(input, "filesystem loop"),
                })?;
                if entry.file_type().is_file() {
                    files.insert(entry.into_path());
                }
            }
        }
        debug!("Discovered {} files", files.len());
        Ok(files.into_iter().collect())
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        if is_hidden(entry.path()) {
            return true;
        }
        match &self.excluded {
            Some(excluded) if entry.file_type().is_dir() => entry
                .path()
                .canonicalize()
                .is_ok_and(|path| path.starts_with(excluded)),
            _ => false,
        }
    }
}

/// Dot files and `~$` lock files left behind by spreadsheet programs
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') || name.starts_with("~$"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Helper to create a small lab share
    fn create_share(temp_dir: &TempDir) -> PathBuf {
        let share = temp_dir.path().join("share");
        let run = share.join("RUN1").join("Software file");
        fs::create_dir_all(&run).unwrap();
        fs::write(run.join("RUN1.rcp"), "1\n10\n").unwrap();
        fs::write(share.join("RUN1").join("~$RUN1.xlsx"), "lock").unwrap();
        fs::write(share.join("cz-1_sensors.csv"), "time_rel\n0\n").unwrap();
        fs::write(share.join(".DS_Store"), "").unwrap();

        let out = share.join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("RUN1.archive.json"), "{}").unwrap();
        share
    }

    #[test]
    fn test_discover_walks_directories() {
        let temp_dir = TempDir::new().unwrap();
        let share = create_share(&temp_dir);

        let files = FileDiscovery::new(&[share.clone()])
            .excluding(&share.join("out"))
            .discover()
            .unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["RUN1.rcp", "cz-1_sensors.csv"]);
    }

    #[test]
    fn test_output_directory_is_walked_without_exclusion() {
        let temp_dir = TempDir::new().unwrap();
        let share = create_share(&temp_dir);

        let files = FileDiscovery::new(&[share]).discover().unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_explicit_files_are_kept_once() {
        let temp_dir = TempDir::new().unwrap();
        let share = create_share(&temp_dir);
        let sensors = share.join("cz-1_sensors.csv");

        let files = FileDiscovery::new(&[sensors.clone(), sensors.clone()])
            .discover()
            .unwrap();
        assert_eq!(files, vec![sensors]);
    }

    #[test]
    fn test_missing_input() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        match FileDiscovery::new(&[missing.clone()]).discover().unwrap_err() {
            ParseError::InputNotFound { path } => assert_eq!(path, missing),
            other => panic!("Expected InputNotFound error, got {other}"),
        }
    }

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(Path::new("/data/.git")));
        assert!(is_hidden(Path::new("~$growth.xlsx")));
        assert!(!is_hidden(Path::new("growth.xlsx")));
    }
}
