//! Pulsed laser deposition runs from a recipe event log (`.elog`) and the
//! matching data log (`.dlog`).
//!
//! Both files are named `DDMMYYYY_HHMM-NAME`. The event log lists every step
//! as a triple of lines: step start (`...:recipe`), pulse count, step end.
//! Data rows are assigned to the step whose `[start, start + duration)`
//! window contains them.

use super::{ParseContext, ParseOutput, Parser, display_name};
use crate::constants::{methods, sections};
use crate::error::{ParseError, Result};
use crate::models::{
    Document, EntryData, Environment, GasFlow, ProcessStep, RunRecord, SampleParameters, Source,
    SourceKind,
};
use crate::sheet::{Cell, DelimitedOptions, read_delimited};
use crate::timeseries::{Series, TimeSeries};
use crate::units::Unit;
use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const EVENT_COLUMNS: [&str; 2] = ["time_h", "process"];
const DATA_COLUMNS: [&str; 9] = [
    "time_s",
    "temperature_degc",
    "pressure2_mbar",
    "o2_flow_sccm",
    "n2_ar_flow_sccm",
    "frequency_hz",
    "laser_energy_mj",
    "pressure1_mbar",
    "zeros",
];
const ABORT_EVENT: &str = "Abort Button pressed";
const RUN_DATETIME_FORMAT: &str = "%d%m%Y_%H%M";
/// KrF excimer line
const LASER_WAVELENGTH_M: f64 = 248e-9;
const HEATER: &str = "Resistive element";

const LOG_NAME: &str = r"^(?P<datetime>\d{8}_\d{4})-(?P<name>.+)\.(?:d|e)log$";

pub struct PldParser;

impl Parser for PldParser {
    fn name(&self) -> &'static str {
        "pld-logs"
    }

    fn patterns(&self) -> &'static [&'static str] {
        &["*.elog"]
    }

    fn parse(&self, path: &Path, ctx: &ParseContext<'_>) -> Result<ParseOutput> {
        let file_name = display_name(path);
        let (started, name) = run_identity(&file_name)
            .ok_or_else(|| ParseError::invalid_format(path, "expected DDMMYYYY_HHMM-NAME.elog"))?;
        let lab_id = format!("IKZ_{}_{}", started.format("%Y-%m-%d-%H-%M"), name);

        let mut output = ParseOutput::new();
        if !output.tolerate(ctx.ensure_new(&lab_id, "GrowthRun"))? {
            return Ok(output);
        }

        let data_log = data_log_path(path);
        if !data_log.is_file() {
            return Err(ParseError::invalid_format(
                path,
                format!("data log {} not found", display_name(&data_log)),
            ));
        }

        let events = read_events(path)?;
        let rows = read_data(&data_log)?;
        let switch = ctx.config.pld_pressure_switch_mbar;

        let mut steps = Vec::new();
        for (position, plan) in plan_steps(path, &events)?.into_iter().enumerate() {
            let window: Vec<&DataRow> = rows
                .iter()
                .filter(|row| plan.start <= row.time && row.time < plan.start + plan.duration)
                .collect();
            debug!(
                "Step '{}': {} data rows from {} s",
                plan.recipe,
                window.len(),
                plan.start
            );
            steps.push(build_step(position + 1, &plan, &window, switch)?);
        }

        let end_time = events
            .last()
            .and_then(|event| Duration::try_milliseconds((event.time * 1000.0) as i64))
            .and_then(|offset| started.checked_add_signed(offset));
        info!("{}: {} steps, {} data rows", file_name, steps.len(), rows.len());

        let run = RunRecord {
            name: name.clone(),
            lab_id: lab_id.clone(),
            method: methods::PLD.to_string(),
            description: None,
            datetime: Some(started.format("%Y-%m-%dT%H:%M:%S").to_string()),
            end_time: end_time.map(|end| end.format("%Y-%m-%dT%H:%M:%S").to_string()),
            data_file: Some(display_name(&data_log)),
            recipe_file: Some(file_name),
            steps,
        };
        output.push(Document::new(
            ctx.file_name(&lab_id, Some(sections::GROWTH_PLD)),
            path,
            EntryData::GrowthRun(run),
        ));
        Ok(output)
    }
}

/// Run start and short name encoded in a log file name
pub fn run_identity(file_name: &str) -> Option<(NaiveDateTime, String)> {
    let pattern = Regex::new(LOG_NAME).ok()?;
    let captures = pattern.captures(file_name)?;
    let started = NaiveDateTime::parse_from_str(&captures["datetime"], RUN_DATETIME_FORMAT).ok()?;
    Some((started, captures["name"].to_string()))
}

/// Target code of a recipe name: `depSTO700` is step `dep` on target `STO`
/// at 700 degrees.
pub fn recipe_target(recipe: &str) -> Option<String> {
    let rest = recipe.trim_start_matches(|c: char| c.is_ascii_lowercase());
    let target: String = rest.chars().take_while(char::is_ascii_uppercase).collect();
    let temperature = &rest[target.len()..];
    if target.is_empty() || !temperature.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(target)
}

/// Seconds of an `h:m:s` stamp or a plain number of seconds
pub fn clock_seconds(cell: &Cell) -> Option<f64> {
    if let Some(seconds) = cell.as_f64() {
        return Some(seconds);
    }
    let text = cell.as_text()?;
    let mut parts = text.split(':').map(|part| part.trim().parse::<u32>().ok());
    let (hours, minutes, seconds) = (parts.next()??, parts.next()??, parts.next()??);
    if parts.next().is_some() {
        return None;
    }
    let total = hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?;
    Some(f64::from(total))
}

#[derive(Debug, Clone, PartialEq)]
struct Event {
    time: f64,
    process: String,
}

#[derive(Debug, Clone, PartialEq)]
struct StepPlan {
    recipe: String,
    start: f64,
    duration: f64,
    pulses: u64,
}

#[derive(Debug, Clone, Copy)]
struct DataRow {
    time: f64,
    temperature_degc: Option<f64>,
    pressure1_mbar: Option<f64>,
    pressure2_mbar: Option<f64>,
    o2_flow_sccm: Option<f64>,
    n2_ar_flow_sccm: Option<f64>,
    frequency_hz: Option<f64>,
    laser_energy_mj: Option<f64>,
}

impl DataRow {
    /// Gauge 1, or gauge 2 while gauge 1 sits inside the switch window
    fn pressure_mbar(&self, (low, high): (f64, f64)) -> Option<f64> {
        match self.pressure1_mbar {
            Some(p1) if (low..=high).contains(&p1) => self.pressure2_mbar,
            other => other,
        }
    }

    fn laser_power_w(&self) -> Option<f64> {
        Some(self.laser_energy_mj? * 1e-3 * self.frequency_hz?)
    }
}

fn read_events(path: &Path) -> Result<Vec<Event>> {
    let sheet = read_delimited(path, &DelimitedOptions::tab_separated(&EVENT_COLUMNS))?;
    let times = sheet.column(EVENT_COLUMNS[0])?;
    let processes = sheet.column(EVENT_COLUMNS[1])?;
    let mut events = Vec::with_capacity(times.len());
    for (line, (time, process)) in times.iter().zip(processes.iter()).enumerate() {
        let process = process.as_text().unwrap_or_default();
        if process.contains(ABORT_EVENT) {
            debug!("Ignoring abort event on line {}", line + 1);
            continue;
        }
        let time = clock_seconds(time).ok_or_else(|| {
            ParseError::invalid_format(path, format!("line {}: unreadable time stamp", line + 1))
        })?;
        events.push(Event { time, process });
    }
    Ok(events)
}

/// Steps start on every third event from the second one on; the event after
/// each start carries the pulse count. The final event only closes the log.
fn plan_steps(path: &Path, events: &[Event]) -> Result<Vec<StepPlan>> {
    if events.len() < 2 {
        return Err(ParseError::invalid_format(path, "event log has no steps"));
    }
    let body = &events[..events.len() - 1];
    let starts: Vec<usize> = (1..body.len()).step_by(3).collect();
    let pulse_lines: Vec<usize> = (2..body.len()).step_by(3).collect();
    if starts.len() != pulse_lines.len() {
        warn!(
            "{}: {} step starts but {} pulse lines, trailing step dropped",
            display_name(path),
            starts.len(),
            pulse_lines.len()
        );
    }

    starts
        .iter()
        .zip(pulse_lines.iter())
        .map(|(&start, &pulses)| {
            let event = &events[start];
            let pulses_text = events[pulses].process.split_whitespace().next().unwrap_or_default();
            let pulses = pulses_text.parse::<u64>().map_err(|_| {
                ParseError::invalid_format(
                    path,
                    format!("line {}: '{}' is not a pulse count", pulses + 1, pulses_text),
                )
            })?;
            Ok(StepPlan {
                recipe: event.process.split(':').nth(1).unwrap_or_default().trim().to_string(),
                start: event.time,
                duration: events[start + 1].time - event.time,
                pulses,
            })
        })
        .collect()
}

fn read_data(path: &Path) -> Result<Vec<DataRow>> {
    let sheet = read_delimited(path, &DelimitedOptions::tab_separated(&DATA_COLUMNS))?;
    let numbers = |column: &str| -> Result<Vec<Option<f64>>> {
        if !sheet.has_column(column) {
            return Ok(vec![None; sheet.height()]);
        }
        Ok(sheet.column(column)?.iter().map(Cell::as_f64).collect())
    };
    let time = numbers("time_s")?;
    let temperature = numbers("temperature_degc")?;
    let pressure2 = numbers("pressure2_mbar")?;
    let o2 = numbers("o2_flow_sccm")?;
    let n2_ar = numbers("n2_ar_flow_sccm")?;
    let frequency = numbers("frequency_hz")?;
    let energy = numbers("laser_energy_mj")?;
    let pressure1 = numbers("pressure1_mbar")?;

    Ok((0..sheet.height())
        .filter_map(|row| {
            Some(DataRow {
                time: time[row]?,
                temperature_degc: temperature[row],
                pressure1_mbar: pressure1[row],
                pressure2_mbar: pressure2[row],
                o2_flow_sccm: o2[row],
                n2_ar_flow_sccm: n2_ar[row],
                frequency_hz: frequency[row],
                laser_energy_mj: energy[row],
            })
        })
        .collect())
}

fn window_series(
    window: &[&DataRow],
    unit: Unit,
    value: impl Fn(&DataRow) -> Option<f64>,
) -> Result<TimeSeries> {
    let series = Series::from_pairs(window.iter().filter_map(|row| Some((row.time, value(row)?))))?;
    TimeSeries::builder(unit).measured(series).build()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn build_step(
    step_index: usize,
    plan: &StepPlan,
    window: &[&DataRow],
    switch: (f64, f64),
) -> Result<ProcessStep> {
    let target = recipe_target(&plan.recipe);
    let mut laser = Source::new("Laser", SourceKind::Laser, None);
    laser.target = target;
    laser.vapor_source.power = Some(window_series(window, Unit::Watt, DataRow::laser_power_w)?);
    laser.vapor_source.wavelength = Some(LASER_WAVELENGTH_M);
    laser.vapor_source.repetition_rate = mean(window.iter().filter_map(|row| row.frequency_hz));
    laser.vapor_source.pulses = Some(plan.pulses);

    let environment = Environment {
        pressure: Some(window_series(window, Unit::Millibar, |row| row.pressure_mbar(switch))?),
        gas_flow: vec![
            GasFlow {
                gas: "Oxygen".to_string(),
                flow_rate: window_series(window, Unit::CubicCentimeterPerMinute, |row| {
                    row.o2_flow_sccm
                })?,
            },
            GasFlow {
                gas: "Argon/Nitrogen".to_string(),
                flow_rate: window_series(window, Unit::CubicCentimeterPerMinute, |row| {
                    row.n2_ar_flow_sccm
                })?,
            },
        ],
        ..Environment::default()
    };

    let sample = SampleParameters {
        substrate_temperature: Some(window_series(window, Unit::DegreeCelsius, |row| {
            row.temperature_degc
        })?),
        heater: Some(HEATER.to_string()),
        ..SampleParameters::default()
    };

    Ok(ProcessStep {
        name: Some(plan.recipe.clone()),
        step_index,
        duration: Some(plan.duration),
        creates_new_thin_film: Some(plan.pulses > 0),
        sources: vec![laser],
        sample_parameters: vec![sample],
        environment,
    })
}

/// `.dlog` companion of an event log
pub fn data_log_path(event_log: &Path) -> PathBuf {
    event_log.with_extension("dlog")
}
