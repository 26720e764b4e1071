use clap::Parser;
use growthlog::cli::{self, Args};
use std::process;

fn main() {
    let args = Args::parse();

    if let Err(error) = cli::setup_logging(&args) {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }

    match cli::run(args) {
        Ok(stats) if stats.has_failures() => process::exit(1),
        Ok(_) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
