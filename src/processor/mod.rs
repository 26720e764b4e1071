//! Processing engine.
//!
//! Discovers input files, hands each one to the first parser that accepts
//! it and writes the returned documents. A file is all or nothing: documents
//! are written only when its parser returned without a structural error.
//! Every written record is added to the in-memory index, so later files of
//! the same run see it as existing.

pub mod discovery;

#[cfg(test)]
pub mod tests;

use self::discovery::FileDiscovery;

use crate::config::ParserConfig;
use crate::constants::{PROGRESS_CHARS, PROGRESS_TEMPLATE};
use crate::error::Result;
use crate::lookup::{InMemoryIndex, RecordMatch};
use crate::models::{Document, ProcessingStats};
use crate::parsers::{ParseContext, ParserRegistry, display_name};
use crate::writer::{ArchiveWriter, DocumentSink, stable_entry_id};

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs the parsers over a set of inputs
pub struct Processor {
    config: ParserConfig,
    registry: ParserRegistry,
    index: InMemoryIndex,
    writer: ArchiveWriter,
    show_progress: bool,
}

impl Processor {
    /// Validate `config` and index the records already in its output directory
    pub fn new(config: ParserConfig) -> Result<Self> {
        config.validate()?;
        let index = InMemoryIndex::from_directory(&config.output_dir)?;
        info!(
            "{} existing records in {}",
            index.len(),
            config.output_dir.display()
        );
        Ok(Self {
            writer: ArchiveWriter::new(&config),
            registry: ParserRegistry::default(),
            index,
            config,
            show_progress: false,
        })
    }

    pub fn with_registry(mut self, registry: ParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Draw a progress bar on stderr while processing
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    pub fn index(&self) -> &InMemoryIndex {
        &self.index
    }

    /// Process every file below `inputs`
    pub fn process(&mut self, inputs: &[PathBuf]) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        let files = FileDiscovery::new(inputs)
            .excluding(&self.config.output_dir)
            .discover()?;
        info!("Found {} candidate files", files.len());

        let mut stats = ProcessingStats {
            files_seen: files.len(),
            output_path: self.config.output_dir.clone(),
            ..Default::default()
        };

        let pb = self.progress_bar(files.len());
        for path in &files {
            pb.set_message(display_name(path));
            self.process_file(path, &mut stats);
            pb.inc(1);
        }
        pb.finish_and_clear();

        stats.processing_time_ms = start_time.elapsed().as_millis();
        info!(
            "Parsed {} of {} files, {} documents written in {}ms",
            stats.files_parsed, stats.files_seen, stats.documents_written, stats.processing_time_ms
        );
        Ok(stats)
    }

    fn process_file(&mut self, path: &Path, stats: &mut ProcessingStats) {
        let Some(parser) = self.registry.find(path, &self.config) else {
            debug!("No parser for {}", path.display());
            stats.files_unmatched += 1;
            return;
        };
        let parser_name = parser.name();
        info!("Parsing {} with {}", path.display(), parser_name);

        let ctx = ParseContext::new(&self.config, &self.index);
        let output = match parser.parse(path, &ctx) {
            Ok(output) => output,
            Err(err) => {
                error!("{} ({}): {}", path.display(), parser_name, err);
                stats.files_failed += 1;
                return;
            }
        };

        stats.documents_skipped += output.skipped.len();
        stats.warnings += output.skipped.len();
        if output.documents.is_empty() && output.skipped.is_empty() {
            warn!("{} produced no documents", path.display());
            stats.warnings += 1;
        }

        for document in &output.documents {
            match self.writer.write_record(document) {
                Ok(_) => {
                    stats.documents_written += 1;
                    self.remember(document);
                }
                Err(err) => {
                    error!("Could not write {}: {}", document.file_name, err);
                    stats.files_failed += 1;
                    return;
                }
            }
        }
        stats.files_parsed += 1;
    }

    fn remember(&mut self, document: &Document) {
        if let Some(lab_id) = document.lab_id() {
            self.index.insert(RecordMatch {
                lab_id: lab_id.to_string(),
                kind: document.data.kind().to_string(),
                entry_id: stable_entry_id(&self.config.namespace, &document.file_name),
                file_name: document.file_name.clone(),
            });
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(PROGRESS_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars(PROGRESS_CHARS),
        );
        pb
    }
}
