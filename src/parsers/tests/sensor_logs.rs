//! Czochralski multilog sensor exports

use super::{Harness, assert_close, find};
use crate::models::EntryData;
use crate::parsers::ParserRegistry;
use crate::parsers::sensors::SensorLogParser;
use crate::units::Unit;
use std::fs;

const SENSORS: &str = "\
# exported by multilog
time_rel,time_abs,TE_1_K_bottom_axis,Pt100_2_degC_crucible,flag
0.0,2023-01-01 10:00:00,300.0,25.0,
1.0,2023-01-01 10:00:01,301.0,26.0,
2.5,2023-01-01 10:00:02,,27.0,
";

#[test]
fn test_sensor_columns_become_series_on_the_shared_axis() {
    let harness = Harness::new();
    let path = harness.path("cz-118_sensors.csv");
    fs::write(&path, SENSORS).unwrap();

    assert_eq!(
        ParserRegistry::default()
            .find(&path, &harness.config)
            .map(|p| p.name()),
        Some("cz-sensor-log")
    );

    let output = harness.parse(&SensorLogParser, &path).unwrap();
    let log = match &find(&output, "cz-118.archive.json").data {
        EntryData::SensorLog(log) => log,
        other => panic!("expected a sensor log, got {}", other.kind()),
    };

    assert_eq!(log.time_axis.elapsed_time, vec![0.0, 1.0, 2.5]);
    assert_eq!(log.time_axis.timestamp.len(), 3);
    assert_eq!(log.sensors.len(), 2, "empty sensor columns are left out");

    let thermocouple = &log.sensors[0];
    assert_eq!(thermocouple.name, "TE_1_K_bottom_axis");
    assert_eq!(thermocouple.value_log.unit(), Unit::Kelvin);
    let measured = thermocouple.value_log.measured().unwrap();
    assert_eq!(measured.time(), &[0.0, 1.0]);
    assert_eq!(measured.value(), &[300.0, 301.0]);

    let crucible = log.sensors[1].value_log.measured().unwrap();
    assert_eq!(crucible.time(), &[0.0, 1.0, 2.5]);
    assert_close(crucible.value()[2], 300.15);
}

#[test]
fn test_multilog_suffix_is_stripped_from_the_name() {
    let harness = Harness::new();
    let path = harness.path("pull-3.multilog.csv");
    fs::write(&path, "time_rel,IGA_6_mbar\n0,1.0\n").unwrap();

    let output = harness.parse(&SensorLogParser, &path).unwrap();
    let document = find(&output, "pull-3.archive.json");
    match &document.data {
        EntryData::SensorLog(log) => {
            assert_eq!(log.sensors[0].value_log.unit(), Unit::Pascal);
            assert_close(log.sensors[0].value_log.measured().unwrap().value()[0], 100.0);
        }
        other => panic!("expected a sensor log, got {}", other.kind()),
    }
}
