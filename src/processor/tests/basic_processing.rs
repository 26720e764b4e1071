//! Basic processing tests

use super::{GROWTH_HEADERS, RECIPE, SENSORS, Share, growth_row};
use crate::lookup::RecordIndex;
use crate::processor::Processor;

#[test]
fn test_files_are_routed_and_written() {
    let share = Share::new();
    share.write("cz-4_sensors.csv", SENSORS);
    share.write("RUN9/Software file/RUN9.rcp", RECIPE);
    share.write("notes.txt", "not an instrument file");

    let mut processor = Processor::new(share.config()).unwrap();
    let stats = processor.process(&[share.input()]).unwrap();

    assert_eq!(stats.files_seen, 3);
    assert_eq!(stats.files_parsed, 2);
    assert_eq!(stats.files_unmatched, 1);
    assert_eq!(stats.files_failed, 0);
    assert_eq!(stats.documents_written, 2);
    assert_eq!(stats.output_path, share.output());
    assert!(!stats.has_failures());

    assert_eq!(share.written(), vec!["RUN9.archive.json", "cz-4.archive.json"]);
}

#[test]
fn test_written_records_are_indexed() {
    let share = Share::new();
    share.growth_workbook("growth.xlsx", GROWTH_HEADERS, vec![growth_row("S5")]);

    let mut processor = Processor::new(share.config()).unwrap();
    let stats = processor.process(&[share.input()]).unwrap();

    assert_eq!(stats.documents_written, 3);
    let kinds: Vec<String> = processor
        .index()
        .find_by_lab_id("S5")
        .into_iter()
        .map(|record| record.kind)
        .collect();
    assert!(kinds.contains(&"GrowthRun".to_string()));
    assert!(kinds.contains(&"ThinFilmStack".to_string()));
}

#[test]
fn test_second_run_skips_existing_records() {
    let share = Share::new();
    share.growth_workbook("growth.xlsx", GROWTH_HEADERS, vec![growth_row("S5")]);

    Processor::new(share.config())
        .unwrap()
        .process(&[share.input()])
        .unwrap();

    let stats = Processor::new(share.config())
        .unwrap()
        .process(&[share.input()])
        .unwrap();
    assert_eq!(stats.files_parsed, 1);
    assert_eq!(stats.documents_written, 0);
    assert_eq!(stats.documents_skipped, 1);
    assert_eq!(stats.warnings, 1);

    let stats = Processor::new(share.config().with_overwrite())
        .unwrap()
        .process(&[share.input()])
        .unwrap();
    assert_eq!(stats.documents_written, 3);
    assert_eq!(stats.documents_skipped, 0);
}

#[test]
fn test_output_inside_input_is_not_reparsed() {
    let share = Share::new();
    share.write("cz-4_sensors.csv", SENSORS);
    let config = share.config().with_output_dir(share.input().join("archive"));

    let mut processor = Processor::new(config.clone()).unwrap();
    processor.process(&[share.input()]).unwrap();
    let stats = Processor::new(config)
        .unwrap()
        .process(&[share.input()])
        .unwrap();

    assert_eq!(stats.files_seen, 1);
}

#[test]
fn test_run_folder_workbook_leaves_the_run_to_its_recipe() {
    for workbook in ["growth.xlsx", "Growth.xlsx"] {
        let share = Share::new();
        share.write("RUN42/Software file/RUN42.rcp", RECIPE);
        share.growth_workbook(
            &format!("RUN42/{workbook}"),
            GROWTH_HEADERS,
            vec![growth_row("RUN42"), growth_row("S7")],
        );

        let mut processor = Processor::new(share.config()).unwrap();
        let stats = processor.process(&[share.input()]).unwrap();

        assert_eq!(stats.files_failed, 0, "{workbook}");
        assert_eq!(stats.documents_skipped, 0, "{workbook}");
        assert_eq!(
            share.written(),
            vec![
                "RUN42.archive.json",
                "S7.GrowthMovpeIKZ.archive.json",
                "S7.ThinFilmStackMovpe.archive.json",
                "S7_1.ThinFilm.archive.json",
            ],
            "{workbook}"
        );
    }
}
