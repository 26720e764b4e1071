//! Recipe logs with and without a companion growth workbook

use super::{Harness, N, SheetFixture, T, assert_close, find, run_of, write_workbook};
use crate::config::DepositionStep;
use crate::error::ParseError;
use crate::parsers::ParserRegistry;
use crate::parsers::movpe_recipe::RecipeParser;
use crate::units::Unit;
use std::fs;
use std::path::PathBuf;

const RECIPE: &str = "3 steps\n\
10 20 30\n\
header\n\
3\n\
10 20 30\n\
0 0 0\n\
0 0 0\n\
21\n\
100 200 300\n\
0 0 0\n\
0 1 0\n\
99\n\
1 1 1\n\
0 0 0\n\
0 0 0\n";

fn recipe_run(harness: &Harness) -> PathBuf {
    let path = harness.path("RUN42/Software file/RUN42.rcp");
    fs::write(&path, RECIPE).unwrap();
    path
}

fn companion_workbook(harness: &Harness, number: f64) {
    write_workbook(
        &harness.path("RUN42/RUN42_parameters.xlsx"),
        &[SheetFixture {
            name: "Ti Sr Parameter",
            headers: &[
                "Sample ID",
                "Substrate ID",
                "number",
                "Comment",
                "Fil time",
                "Read Fil T",
                "Fil time",
                "Read Fil T",
            ],
            rows: vec![vec![
                T("RUN42"),
                T("SUB-1"),
                N(number),
                T(""),
                N(0.0),
                N(700.0),
                N(10.0),
                N(710.0),
            ]],
        }],
    );
}

#[test]
fn test_recipe_channels_become_indexed_set_points() {
    let harness = Harness::new();
    let path = recipe_run(&harness);

    let output = harness.parse(&RecipeParser, &path).unwrap();
    let run = run_of(find(&output, "RUN42.archive.json"));
    assert_eq!(run.lab_id, "RUN42");
    assert_eq!(run.recipe_file.as_deref(), Some("RUN42.rcp"));
    assert_eq!(run.steps.len(), 3);

    let starts = [0.0, 10.0, 30.0];
    for (i, step) in run.steps.iter().enumerate() {
        assert_eq!(step.duration, Some([10.0, 20.0, 30.0][i]));

        let flow = step.environment.uniform_gas_flow_rate.as_ref().unwrap();
        assert_eq!(flow.unit(), Unit::CubicMeterPerSecond);
        let set = flow.set_point().unwrap();
        assert_eq!(set.time(), &[starts[i]]);
        assert_close(set.value()[0], (i + 1) as f64 * 1e-6 / 60.0);

        let rotation = step.environment.rotation.as_ref().unwrap();
        assert_close(
            rotation.set_point().unwrap().value()[0],
            Unit::RevolutionPerMinute.to_canonical(10.0 * (i + 1) as f64),
        );
    }
}

#[test]
fn test_companion_workbook_readings_land_on_deposition_step() {
    let mut harness = Harness::new();
    harness.config = harness.config.clone().with_deposition_step(DepositionStep::Fixed(2));
    let path = recipe_run(&harness);
    companion_workbook(&harness, 1.0);

    let output = harness.parse(&RecipeParser, &path).unwrap();
    let run = run_of(find(&output, "RUN42.archive.json"));

    assert!(run.steps[0].sample_parameters[0].filament_temperature.is_none());
    let filament = run.steps[1].sample_parameters[0]
        .filament_temperature
        .as_ref()
        .unwrap();
    let measured = filament.measured().unwrap();
    assert_eq!(measured.time(), &[10.0, 610.0]);
    assert_close(measured.value()[0], 973.15);
}

#[test]
fn test_row_number_beyond_step_count_fails_the_file() {
    let mut harness = Harness::new();
    harness.config = harness.config.clone().with_deposition_step(DepositionStep::RowNumber);
    let path = recipe_run(&harness);
    companion_workbook(&harness, 5.0);

    match harness.parse(&RecipeParser, &path).unwrap_err() {
        ParseError::StepIndexOutOfRange { index, total } => {
            assert_eq!(index, 5);
            assert_eq!(total, 3);
        }
        other => panic!("expected StepIndexOutOfRange, got {other}"),
    }
}

#[test]
fn test_recipe_outside_software_folder_is_rejected() {
    let harness = Harness::new();
    let path = harness.path("loose/RUN1.rcp");
    fs::write(&path, RECIPE).unwrap();

    assert!(matches!(
        harness.parse(&RecipeParser, &path),
        Err(ParseError::InvalidFormat { .. })
    ));
    assert!(ParserRegistry::default().find(&path, &harness.config).is_none());
}

#[test]
fn test_short_channel_block_is_an_error() {
    let harness = Harness::new();
    let path = harness.path("RUN7/Software file/RUN7.rcp");
    fs::write(&path, "2\n10 10\n\n23\n5\n0\n0\n").unwrap();

    assert!(matches!(
        harness.parse(&RecipeParser, &path),
        Err(ParseError::InvalidSeries { .. })
    ));
}
