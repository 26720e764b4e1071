//! Archive document writing.
//!
//! Documents are written whole, as pretty JSON or YAML, wrapped in a
//! metadata envelope. Entry ids derive only from the namespace and the file
//! name, so rewriting an unchanged document reproduces the same bytes.

use crate::config::{OutputFormat, ParserConfig};
use crate::constants::ARCHIVE_INFIX;
use crate::error::Result;
use crate::models::{Document, EntryData, Reference};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Narrow write interface to the record store
pub trait DocumentSink {
    /// Persist `document`, replacing any previous version; returns where it went
    fn write_record(&mut self, document: &Document) -> Result<PathBuf>;
}

/// Stable identifier of the document `file_name` in `namespace`
pub fn stable_entry_id(namespace: &str, file_name: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{namespace}/{file_name}").as_bytes()).to_string()
}

/// Archive path referencing the document `file_name` in `namespace`
pub fn reference_path(namespace: &str, file_name: &str) -> String {
    format!(
        "../uploads/{}/archive/{}#data",
        namespace,
        stable_entry_id(namespace, file_name)
    )
}

/// Reference to another document, carrying its lab id when known
pub fn reference(namespace: &str, file_name: &str, lab_id: Option<&str>) -> Reference {
    Reference {
        name: lab_id.map(str::to_string),
        lab_id: lab_id.map(str::to_string),
        reference: reference_path(namespace, file_name),
    }
}

/// `{stem}.{section}.archive.{ext}`, or `{stem}.archive.{ext}` without a section
pub fn archive_file_name(stem: &str, section: Option<&str>, format: OutputFormat) -> String {
    match section {
        Some(section) => format!("{stem}.{section}.{ARCHIVE_INFIX}.{}", format.extension()),
        None => format!("{stem}.{ARCHIVE_INFIX}.{}", format.extension()),
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    metadata: Metadata<'a>,
    data: &'a EntryData,
}

#[derive(Serialize)]
struct Metadata<'a> {
    entry_id: String,
    upload_id: &'a str,
    mainfile: &'a str,
    source_file: String,
}

/// Writes documents into a local output directory
#[derive(Debug)]
pub struct ArchiveWriter {
    output_dir: PathBuf,
    namespace: String,
    format: OutputFormat,
}

impl ArchiveWriter {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            namespace: config.namespace.clone(),
            format: config.output_format,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn document_path(&self, document: &Document) -> PathBuf {
        self.output_dir.join(&document.file_name)
    }

    /// Serialized form of `document`, as written to disk
    pub fn render(&self, document: &Document) -> Result<String> {
        let source_file = document
            .source_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let envelope = Envelope {
            metadata: Metadata {
                entry_id: stable_entry_id(&self.namespace, &document.file_name),
                upload_id: &self.namespace,
                mainfile: &document.file_name,
                source_file,
            },
            data: &document.data,
        };
        let text = match self.format {
            OutputFormat::Json => {
                let mut text = serde_json::to_string_pretty(&envelope)?;
                text.push('\n');
                text
            }
            OutputFormat::Yaml => serde_yaml::to_string(&envelope)?,
        };
        Ok(text)
    }
}

impl DocumentSink for ArchiveWriter {
    fn write_record(&mut self, document: &Document) -> Result<PathBuf> {
        let text = self.render(document)?;
        fs::create_dir_all(&self.output_dir)?;
        let path = self.document_path(document);
        fs::write(&path, text)?;
        debug!("Wrote {} ({})", path.display(), document.data.kind());
        Ok(path)
    }
}
