//! Manual and digital directional-solidification protocols

use super::{Blank, Harness, N, SheetFixture, T, assert_close, find, write_workbook};
use crate::models::{EntryData, FurnaceProtocol};
use crate::parsers::furnace_digital::DigitalProtocolParser;
use crate::parsers::furnace_manual::ManualProtocolParser;
use crate::parsers::{ParseOutput, Parser, ParserRegistry};
use std::fs;

fn protocol_of<'o>(output: &'o ParseOutput, file_name: &str) -> &'o FurnaceProtocol {
    match &find(output, file_name).data {
        EntryData::FurnaceProtocol(protocol) => protocol,
        other => panic!("expected a furnace protocol, got {}", other.kind()),
    }
}

#[test]
fn test_manual_protocol_heaters_and_temperatures() {
    let mut harness = Harness::new();
    harness.config = harness.config.clone().with_heater_count(2);
    let path = harness.path("DS-12.xlsx");
    write_workbook(
        &path,
        &[SheetFixture {
            name: "Sheet1",
            headers: &[
                "Ending time", "T12", "T13", "T14", "Tpyr", "Ttp", "phi1_F1", "f1_F1", "Iac1_F1",
                "Iges1", "P1",
            ],
            rows: vec![
                vec![
                    T("2023-05-01 08:00:00"),
                    N(1500.0),
                    N(1490.0),
                    N(1480.0),
                    N(1700.0),
                    Blank,
                    N(30.0),
                    N(50.0),
                    N(4.0),
                    N(10.0),
                    N(900.0),
                ],
                vec![
                    T("2023-05-01 08:10:00"),
                    N(1510.0),
                    N(1495.0),
                    N(1485.0),
                    N(1705.0),
                    Blank,
                    N(31.0),
                    N(50.0),
                    N(4.5),
                    N(11.0),
                    N(950.0),
                ],
            ],
        }],
    );

    assert_eq!(
        ParserRegistry::default()
            .find(&path, &harness.config)
            .map(|p| p.name()),
        Some("ds-manual-protocol")
    );

    let output = harness.parse(&ManualProtocolParser, &path).unwrap();
    let protocol = protocol_of(&output, "DS-12.archive.json");
    assert_eq!(protocol.start_time.as_deref(), Some("2023-05-01T08:00:00"));
    assert_eq!(protocol.data_file, "DS-12.xlsx");

    let t12 = protocol.temperature_1_2.as_ref().unwrap().measured().unwrap();
    assert_eq!(t12.time(), &[0.0, 600.0]);
    assert_eq!(t12.value(), &[1500.0, 1510.0]);
    assert!(protocol.temperature_tp.is_none());

    assert_eq!(protocol.heaters.len(), 2);
    let heater = &protocol.heaters[0];
    assert_eq!(heater.name, "heater 1");
    assert_eq!(heater.dc_current.as_ref().unwrap().measured().unwrap().value(), &[10.0, 11.0]);
    assert_eq!(heater.power.as_ref().unwrap().measured().unwrap().value(), &[900.0, 950.0]);
    let phase = heater.f1.phase.as_ref().unwrap().measured().unwrap();
    assert_close(phase.value()[0], 30.0_f64.to_radians());
    assert!(heater.f2.ac_current.is_none());
    assert!(heater.temperature.is_none());

    let idle = &protocol.heaters[1];
    assert_eq!(idle.name, "heater 2");
    assert!(idle.dc_current.is_none() && idle.power.is_none());
}

#[test]
fn test_workbook_without_ending_time_is_not_a_manual_protocol() {
    let harness = Harness::new();
    let path = harness.path("notes.xlsx");
    write_workbook(
        &path,
        &[SheetFixture {
            name: "Sheet1",
            headers: &["T12"],
            rows: vec![vec![N(1.0)]],
        }],
    );
    assert!(!ManualProtocolParser.accepts(&path, &harness.config));
}

const DIGITAL: &str = "\
T Ist H1 Time;T Ist H1 ValueY;AC_F1 H1 Time;AC_F1 H1 ValueY;T12 Time;T12 ValueY;Trafo 1/P ValueY
01.05.2023 08:00:00;1200,5;01.05.2023 08:00:00;3,5;01.05.2023 08:00:00;1500,0;0,25
01.05.2023 08:01:00;1201,0;01.05.2023 08:01:00;3,75;01.05.2023 08:01:00;1502,0;0,5
";

#[test]
fn test_digital_protocol_shares_the_reference_clock() {
    let mut harness = Harness::new();
    harness.config = harness.config.clone().with_heater_count(1);
    let path = harness.path("DS-12_digital.csv");
    fs::write(&path, DIGITAL).unwrap();

    assert!(DigitalProtocolParser.accepts(&path, &harness.config));
    let output = harness.parse(&DigitalProtocolParser, &path).unwrap();
    let protocol = protocol_of(&output, "DS-12_digital.archive.json");

    let heater = &protocol.heaters[0];
    let temperature = heater.temperature.as_ref().unwrap().measured().unwrap();
    assert_eq!(temperature.time(), &[0.0, 60.0]);
    assert_close(temperature.value()[0], 1200.5);
    let ac = heater.f1.ac_current.as_ref().unwrap().measured().unwrap();
    assert_close(ac.value()[1], 3.75);
    assert!(heater.f1.phase.is_none());

    assert_close(
        protocol.temperature_1_2.as_ref().unwrap().measured().unwrap().value()[1],
        1502.0,
    );
    assert_eq!(protocol.transformers.len(), 1);
    assert_eq!(protocol.transformers[0].name, "Trafo 1 P");
    assert_close(protocol.transformers[0].reading.measured().unwrap().value()[1], 0.5);
}

#[test]
fn test_plain_csv_is_not_a_digital_protocol() {
    let harness = Harness::new();
    let path = harness.path("plain.csv");
    fs::write(&path, "a,b\n1,2\n").unwrap();
    assert!(!DigitalProtocolParser.accepts(&path, &harness.config));
}
