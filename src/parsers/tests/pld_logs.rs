//! Pulsed laser deposition event and data logs

use super::{Harness, assert_close, find, run_of};
use crate::error::ParseError;
use crate::models::SourceKind;
use crate::parsers::pld::PldParser;
use std::fs;
use std::path::PathBuf;

const EVENTS: &str = "\
00:00:00\tRecipe started
00:00:10\tStep 1:preSTO
00:01:10\t0 pulses
00:01:10\tStep 1 finished
00:01:15\tStep 2:depSTO700
00:01:20\tAbort Button pressed
00:03:40\t1500 pulses
00:03:40\tStep 2 finished
00:03:45\tRecipe finished
";

const DATA: &str = "\
20\t650\t0.04\t5\t0\t10\t200\t0.05\t0
80\t700\t0.04\t5\t1\t10\t200\t0.5\t0
100\t700\t0.04\t5\t1\t10\t200\t0.5\t0
230\t25\t0.04\t0\t0\t0\t0\t1000\t0
";

fn pld_run(harness: &Harness, with_data: bool) -> PathBuf {
    let events = harness.path("15032023_1030-STO12.elog");
    fs::write(&events, EVENTS).unwrap();
    if with_data {
        fs::write(harness.path("15032023_1030-STO12.dlog"), DATA).unwrap();
    }
    events
}

#[test]
fn test_pld_steps_windowed_from_data_log() {
    let harness = Harness::new();
    let path = pld_run(&harness, true);

    let output = harness.parse(&PldParser, &path).unwrap();
    let run = run_of(find(
        &output,
        "IKZ_2023-03-15-10-30_STO12.GrowthPLD.archive.json",
    ));
    assert_eq!(run.lab_id, "IKZ_2023-03-15-10-30_STO12");
    assert_eq!(run.name, "STO12");
    assert_eq!(run.datetime.as_deref(), Some("2023-03-15T10:30:00"));
    assert_eq!(run.end_time.as_deref(), Some("2023-03-15T10:33:45"));
    assert_eq!(run.steps.len(), 2);

    let pre = &run.steps[0];
    assert_eq!(pre.name.as_deref(), Some("preSTO"));
    assert_eq!(pre.duration, Some(60.0));
    assert_eq!(pre.creates_new_thin_film, Some(false));
    let pressure = pre.environment.pressure.as_ref().unwrap().measured().unwrap();
    assert_eq!(pressure.time(), &[20.0]);
    // gauge 1 reads 0.05 mbar, inside the switch window
    assert_close(pressure.value()[0], 4.0);

    let deposition = &run.steps[1];
    assert_eq!(deposition.step_index, 2);
    assert_eq!(deposition.duration, Some(145.0));
    assert_eq!(deposition.creates_new_thin_film, Some(true));

    let laser = &deposition.sources[0];
    assert_eq!(laser.kind, SourceKind::Laser);
    assert_eq!(laser.target.as_deref(), Some("STO"));
    assert_eq!(laser.vapor_source.pulses, Some(1500));
    assert_eq!(laser.vapor_source.repetition_rate, Some(10.0));
    let power = laser.vapor_source.power.as_ref().unwrap().measured().unwrap();
    assert_eq!(power.time(), &[80.0, 100.0]);
    assert_close(power.value()[0], 2.0);

    let pressure = deposition.environment.pressure.as_ref().unwrap().measured().unwrap();
    assert_close(pressure.value()[0], 50.0);
    assert_eq!(deposition.environment.gas_flow.len(), 2);
    assert_eq!(deposition.environment.gas_flow[1].gas, "Argon/Nitrogen");
    assert_close(
        deposition.environment.gas_flow[0].flow_rate.measured().unwrap().value()[0],
        5e-6 / 60.0,
    );

    let substrate = deposition.sample_parameters[0]
        .substrate_temperature
        .as_ref()
        .unwrap()
        .measured()
        .unwrap();
    assert_close(substrate.value()[1], 973.15);
}

#[test]
fn test_missing_data_log_fails_the_run() {
    let harness = Harness::new();
    let path = pld_run(&harness, false);
    assert!(matches!(
        harness.parse(&PldParser, &path),
        Err(ParseError::InvalidFormat { .. })
    ));
}

#[test]
fn test_unexpected_log_name_is_invalid() {
    let harness = Harness::new();
    let path = harness.path("session.elog");
    fs::write(&path, EVENTS).unwrap();
    assert!(matches!(
        harness.parse(&PldParser, &path),
        Err(ParseError::InvalidFormat { .. })
    ));
}
