//! Command-line interface components.

use crate::config::{OutputFormat, ParserConfig};
use crate::models::ProcessingStats;
use crate::parsers::ParserRegistry;
use crate::processor::Processor;
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "growthlog")]
#[command(about = "Convert crystal-growth instrument files into ELN archive documents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Instrument files or directories to scan
    #[arg(value_name = "INPUTS", required_unless_present = "list_parsers")]
    pub inputs: Vec<PathBuf>,

    /// Output directory for archive documents
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Upload namespace used in entry ids and references
    #[arg(long)]
    pub namespace: Option<String>,

    /// Serialization of the written documents
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Replace records whose lab id already exists
    #[arg(long)]
    pub overwrite: bool,

    /// Print the available parsers and exit
    #[arg(long)]
    pub list_parsers: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only warnings and errors, no progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Configuration file values with command-line overrides applied
    pub fn parser_config(&self) -> Result<ParserConfig> {
        let mut config = match &self.config {
            Some(path) => ParserConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => ParserConfig::default(),
        };
        if let Some(output) = &self.output {
            config = config.with_output_dir(output.clone());
        }
        if let Some(namespace) = &self.namespace {
            config = config.with_namespace(namespace.clone());
        }
        if let Some(format) = self.format {
            config = config.with_output_format(format);
        }
        if self.overwrite {
            config = config.with_overwrite();
        }
        Ok(config)
    }
}

/// Set up structured logging on stderr. `RUST_LOG` takes precedence over
/// the verbosity flags.
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("growthlog={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Run the command described by `args`
pub fn run(args: Args) -> Result<ProcessingStats> {
    if args.list_parsers {
        print_parsers(&ParserRegistry::default());
        return Ok(ProcessingStats::default());
    }

    let config = args.parser_config()?;
    if !args.quiet {
        println!("{}", "Converting instrument files".bright_green().bold());
        println!(
            "  {} {}",
            "Output:".bright_cyan(),
            config.output_dir.display()
        );
        println!("  {} {}", "Namespace:".bright_cyan(), config.namespace);
    }

    let mut processor = Processor::new(config)
        .context("Invalid configuration")?
        .with_progress(!args.quiet);
    let stats = processor
        .process(&args.inputs)
        .context("Processing failed")?;

    if !args.quiet {
        print_summary(&stats);
    }
    Ok(stats)
}

fn print_parsers(registry: &ParserRegistry) {
    println!("{}", "Available parsers:".bright_green().bold());
    for parser in registry.parsers() {
        println!(
            "  {:<22} {}",
            parser.name().bright_cyan(),
            parser.patterns().join(", ")
        );
    }
}

fn print_summary(stats: &ProcessingStats) {
    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.processing_time_ms.to_string().bright_white()
    );
    println!(
        "  {} {} of {}",
        "Files parsed:".bright_cyan(),
        stats.files_parsed.to_string().bright_white(),
        stats.files_seen
    );
    if stats.files_unmatched > 0 {
        println!(
            "  {} {}",
            "Files without parser:".bright_cyan(),
            stats.files_unmatched.to_string().bright_white()
        );
    }
    if stats.files_failed > 0 {
        println!(
            "  {} {}",
            "Files failed:".bright_red(),
            stats.files_failed.to_string().bright_red().bold()
        );
    }
    println!(
        "  {} {}",
        "Documents written:".bright_cyan(),
        stats.documents_written.to_string().bright_white().bold()
    );
    if stats.documents_skipped > 0 {
        println!(
            "  {} {}",
            "Existing records skipped:".bright_yellow(),
            stats.documents_skipped.to_string().bright_yellow()
        );
    }
    if stats.warnings > 0 {
        println!(
            "  {} {}",
            "Warnings:".bright_yellow(),
            stats.warnings.to_string().bright_yellow()
        );
    }
}
