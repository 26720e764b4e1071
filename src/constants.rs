//! Application constants for growthlog
//!
//! Default values, worksheet names, file patterns and output naming used
//! throughout the parsers.

// =============================================================================
// Parsing Defaults
// =============================================================================

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "local";

/// Recipe logs store tenths of the physical value
pub const DEFAULT_RECIPE_DIVISOR: f64 = 10.0;

/// Elapsed minutes at which growth-sheet readings are taken
pub const DEFAULT_CHECKPOINT_MINUTES: [f64; 5] = [0.0, 2.0, 30.0, 50.0, 120.0];

/// Heaters in the directional-solidification furnace
pub const DEFAULT_HEATER_COUNT: usize = 9;

/// Absolute timestamp layouts seen in instrument exports
pub const DEFAULT_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Gauge-1 range (mbar) inside which PLD logs report gauge 2 instead
pub const PLD_PRESSURE_SWITCH_MBAR: (f64, f64) = (0.01, 0.1);

// =============================================================================
// Worksheet Names
// =============================================================================

pub mod sheets {
    pub const MOVPE_GROWTH: &str = "Ti Sr Parameter";
    pub const CONSTANT_PARAMETERS: &str = "Overview";
    pub const FURNACE_MANUAL: &str = "Sheet1";
    pub const SUBSTRATES: &str = "Substrates";
}

// =============================================================================
// Output Naming
// =============================================================================

/// Section names used in output file names (`{lab_id}.{SECTION}.archive.{ext}`)
pub mod sections {
    pub const THIN_FILM: &str = "ThinFilm";
    pub const THIN_FILM_STACK: &str = "ThinFilmStackMovpe";
    pub const GROWTH_MOVPE: &str = "GrowthMovpeIKZ";
    pub const SUBSTRATE: &str = "SubstrateMovpe";
    pub const GROWTH_PLD: &str = "GrowthPLD";
}

/// Method names stored on run records
pub mod methods {
    pub const MOVPE: &str = "MOVPE";
    pub const PLD: &str = "Pulsed Laser Deposition";
}

/// Infix of every output document name
pub const ARCHIVE_INFIX: &str = "archive";

/// Folder that holds MOVPE recipe logs inside a run directory
pub const RECIPE_FOLDER: &str = "Software file";

// =============================================================================
// Progress Reporting
// =============================================================================

pub const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
pub const PROGRESS_CHARS: &str = "#>-";
