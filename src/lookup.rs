//! Lookup of records that already exist in the target namespace.
//!
//! Parsers never query a global search service; they receive a
//! [`RecordIndex`] through their parse context and ask it for lab ids.

use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// An existing record carrying a given lab id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMatch {
    pub lab_id: String,
    pub kind: String,
    pub entry_id: String,
    pub file_name: String,
}

pub trait RecordIndex {
    /// All records with `lab_id`, in no particular order
    fn find_by_lab_id(&self, lab_id: &str) -> Vec<RecordMatch>;
}

#[derive(Debug, Default)]
pub struct InMemoryIndex {
    by_lab_id: HashMap<String, Vec<RecordMatch>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: RecordMatch) {
        let entries = self.by_lab_id.entry(record.lab_id.clone()).or_default();
        if !entries.contains(&record) {
            entries.push(record);
        }
    }

    pub fn len(&self) -> usize {
        self.by_lab_id.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_lab_id.is_empty()
    }

    /// Index every archive document found below `dir`. Documents that cannot
    /// be read are skipped with a warning.
    pub fn from_directory(dir: &Path) -> Result<Self> {
        let mut index = Self::new();
        if !dir.exists() {
            return Ok(index);
        }
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let is_yaml = file_name.ends_with(".archive.yaml");
            if !is_yaml && !file_name.ends_with(".archive.json") {
                continue;
            }
            match read_record(path, file_name, is_yaml) {
                Ok(Some(record)) => index.insert(record),
                Ok(None) => {}
                Err(err) => warn!("Skipping unreadable archive {}: {}", path.display(), err),
            }
        }
        debug!("Indexed {} existing records in {}", index.len(), dir.display());
        Ok(index)
    }
}

impl RecordIndex for InMemoryIndex {
    fn find_by_lab_id(&self, lab_id: &str) -> Vec<RecordMatch> {
        self.by_lab_id.get(lab_id).cloned().unwrap_or_default()
    }
}

fn read_record(path: &Path, file_name: &str, is_yaml: bool) -> Result<Option<RecordMatch>> {
    let text = fs::read_to_string(path)?;
    let document: Value = if is_yaml {
        serde_yaml::from_str(&text)?
    } else {
        serde_json::from_str(&text)?
    };
    let Some(lab_id) = document["data"]["lab_id"].as_str() else {
        return Ok(None);
    };
    Ok(Some(RecordMatch {
        lab_id: lab_id.to_string(),
        kind: document["data"]["m_def"].as_str().unwrap_or_default().to_string(),
        entry_id: document["metadata"]["entry_id"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        file_name: file_name.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(lab_id: &str, kind: &str) -> RecordMatch {
        RecordMatch {
            lab_id: lab_id.to_string(),
            kind: kind.to_string(),
            entry_id: format!("{lab_id}-{kind}"),
            file_name: format!("{lab_id}.{kind}.archive.json"),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let mut index = InMemoryIndex::new();
        assert!(index.is_empty());
        index.insert(record("S1", "ThinFilmStack"));
        index.insert(record("S1", "GrowthRun"));
        index.insert(record("S1", "GrowthRun"));

        assert_eq!(index.len(), 2);
        assert_eq!(index.find_by_lab_id("S1").len(), 2);
        assert!(index.find_by_lab_id("S2").is_empty());
    }

    #[test]
    fn test_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("S1.GrowthMovpeIKZ.archive.json"),
            r#"{"metadata": {"entry_id": "abc"}, "data": {"m_def": "GrowthRun", "lab_id": "S1"}}"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested/SUB.SubstrateMovpe.archive.yaml"),
            "metadata:\n  entry_id: def\ndata:\n  m_def: Substrate\n  lab_id: SUB\n",
        )
        .unwrap();
        fs::write(dir.path().join("broken.archive.json"), "{not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "S1").unwrap();

        let index = InMemoryIndex::from_directory(dir.path()).unwrap();
        assert_eq!(index.len(), 2);
        let matches = index.find_by_lab_id("S1");
        assert_eq!(matches[0].entry_id, "abc");
        assert_eq!(matches[0].kind, "GrowthRun");
        assert_eq!(index.find_by_lab_id("SUB")[0].file_name, "SUB.SubstrateMovpe.archive.yaml");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let index = InMemoryIndex::from_directory(Path::new("/nonexistent/growthlog")).unwrap();
        assert!(index.is_empty());
    }
}
