//! Folds channel data into a run's pre-allocated process steps.

use crate::channels::{ChannelRule, ChannelTable, ChannelTarget, Population};
use crate::error::{ParseError, Result};
use crate::models::ProcessStep;
use crate::recipe::ChannelBlock;
use crate::timeseries::{TimeSeries, set_point};
use tracing::{debug, warn};

/// Steps of one run plus the cumulative start time of each step
#[derive(Debug, Clone)]
pub struct StepAssembler {
    steps: Vec<ProcessStep>,
    starts: Vec<f64>,
}

impl StepAssembler {
    /// Allocate `total` MOVPE steps with the given durations in seconds.
    pub fn new(total: usize, durations: &[f64]) -> Result<Self> {
        if durations.len() < total {
            return Err(ParseError::invalid_series(format!(
                "{} steps declared but {} durations given",
                total,
                durations.len()
            )));
        }
        let steps = (0..total)
            .map(|i| ProcessStep::movpe(i + 1, Some(durations[i])))
            .collect();
        Ok(Self::from_steps(steps))
    }

    /// Take over already allocated steps; a step without a duration counts
    /// as zero seconds for the start times of the following ones.
    pub fn from_steps(steps: Vec<ProcessStep>) -> Self {
        let starts = steps
            .iter()
            .scan(0.0, |elapsed, step| {
                let start = *elapsed;
                *elapsed += step.duration.unwrap_or(0.0);
                Some(start)
            })
            .collect();
        Self { steps, starts }
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Start of each step in seconds since the run began
    pub fn step_starts(&self) -> &[f64] {
        &self.starts
    }

    /// Populate one recipe block. Codes missing from `table` are skipped
    /// with a warning and `false` is returned.
    pub fn apply(&mut self, block: &ChannelBlock, table: &ChannelTable) -> Result<bool> {
        debug_assert!(
            table.validate().is_ok(),
            "channel table {} is inconsistent",
            table.name()
        );
        let Some(rule) = table.lookup(&block.code) else {
            warn!(
                "Unknown channel code '{}' in {} table, block skipped",
                block.code,
                table.name()
            );
            return Ok(false);
        };
        self.apply_values(rule, &block.values)?;
        Ok(true)
    }

    /// Write `values` as set points according to the rule's population.
    pub fn apply_values(&mut self, rule: &ChannelRule, values: &[f64]) -> Result<()> {
        match rule.population {
            Population::Indexed => {
                if values.len() < self.steps.len() {
                    return Err(ParseError::invalid_series(format!(
                        "channel '{}' has {} values for {} steps",
                        rule.code,
                        values.len(),
                        self.steps.len()
                    )));
                }
                for index in 0..self.steps.len() {
                    let series = set_point(self.starts[index], values[index], rule.unit)?;
                    self.apply_at(index + 1, rule.target, series)?;
                }
            }
            Population::Broadcast => {
                let Some(value) = values.first() else {
                    return Err(ParseError::invalid_series(format!(
                        "channel '{}' has no value to broadcast",
                        rule.code
                    )));
                };
                for index in 0..self.steps.len() {
                    let series = set_point(self.starts[index], *value, rule.unit)?;
                    self.apply_at(index + 1, rule.target, series)?;
                }
            }
        }
        debug!("Channel '{}' -> {}", rule.code, rule.target.path());
        Ok(())
    }

    /// Layer `series` into `target` of the 1-indexed step; pairs already in
    /// the slot and absent from `series` are kept.
    pub fn apply_at(
        &mut self,
        step_index: usize,
        target: ChannelTarget,
        series: TimeSeries,
    ) -> Result<()> {
        if series.unit().dimension() != target.dimension() {
            return Err(ParseError::UnitMismatch {
                from: series.unit().symbol().to_string(),
                to: target.dimension().canonical().symbol().to_string(),
            });
        }
        let step = self.step_mut(step_index)?;
        let slot = target.slot_mut(step).ok_or_else(|| {
            ParseError::configuration(format!(
                "step {} has no slot for {}",
                step_index,
                target.path()
            ))
        })?;
        *slot = Some(match slot.take() {
            Some(existing) => existing.merge(series)?,
            None => series,
        });
        Ok(())
    }

    /// Attach a measured series to a step, shifting its times by the
    /// cumulative duration of the steps before it.
    pub fn layer_measured(
        &mut self,
        step_index: usize,
        target: ChannelTarget,
        series: TimeSeries,
    ) -> Result<()> {
        let start = self.start_of(step_index)?;
        self.apply_at(step_index, target, series.offset_measured(start))
    }

    pub fn step_mut(&mut self, step_index: usize) -> Result<&mut ProcessStep> {
        let total = self.steps.len();
        step_index
            .checked_sub(1)
            .and_then(|i| self.steps.get_mut(i))
            .ok_or(ParseError::StepIndexOutOfRange {
                index: step_index,
                total,
            })
    }

    fn start_of(&self, step_index: usize) -> Result<f64> {
        step_index
            .checked_sub(1)
            .and_then(|i| self.starts.get(i).copied())
            .ok_or(ParseError::StepIndexOutOfRange {
                index: step_index,
                total: self.steps.len(),
            })
    }

    pub fn finish(self) -> Vec<ProcessStep> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{FE1, RECIPE_CHANNELS, SHEET_SETPOINTS};
    use crate::recipe::RecipeLog;
    use crate::timeseries::Series;
    use crate::units::Unit;
    use std::path::Path;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!(
                (a - e).abs() <= 1e-9 * e.abs().max(1e-9),
                "{actual:?} != {expected:?}"
            );
        }
    }

    #[test]
    fn test_recipe_uniform_gas_flow() {
        let log = RecipeLog::parse(
            "3\n10 20 30\n\n3\n10 20 30\n0 0 0\n0 0 0\n",
            10.0,
            Path::new("run.rcp"),
        )
        .unwrap();
        let mut assembler = StepAssembler::new(log.total_steps, &log.durations).unwrap();
        for block in &log.blocks {
            assert!(assembler.apply(block, &RECIPE_CHANNELS).unwrap());
        }
        let steps = assembler.finish();

        assert_eq!(steps.len(), 3);
        let expected_starts = [0.0, 10.0, 30.0];
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.step_index, i + 1);
            let flow = step.environment.uniform_gas_flow_rate.as_ref().unwrap();
            assert_eq!(flow.unit(), Unit::CubicMeterPerSecond);
            let set = flow.set_point().unwrap();
            assert_close(set.value(), &[(i + 1) as f64 * 1e-6 / 60.0]);
            assert_close(set.time(), &[expected_starts[i]]);
            assert!(flow.measured().is_none());
        }
    }

    #[test]
    fn test_unknown_code_is_skipped() {
        let block = ChannelBlock {
            code: "99".to_string(),
            values: vec![1.0],
            ramps: vec![],
            states: vec![],
        };
        let mut assembler = StepAssembler::new(1, &[5.0]).unwrap();
        assert!(!assembler.apply(&block, &RECIPE_CHANNELS).unwrap());
    }

    #[test]
    fn test_indexed_needs_one_value_per_step() {
        let rule = RECIPE_CHANNELS.lookup("21").unwrap();
        let mut assembler = StepAssembler::new(3, &[1.0, 1.0, 1.0]).unwrap();
        assert!(matches!(
            assembler.apply_values(rule, &[1.0, 2.0]),
            Err(ParseError::InvalidSeries { .. })
        ));
    }

    #[test]
    fn test_broadcast_repeats_value() {
        let rule = SHEET_SETPOINTS.lookup("Set FE1 Temp").unwrap();
        let mut assembler = StepAssembler::new(2, &[60.0, 60.0]).unwrap();
        assembler.apply_values(rule, &[100.0]).unwrap();
        for step in assembler.finish() {
            let temperature = step.sources[FE1].vapor_source.temperature.as_ref().unwrap();
            assert_close(temperature.set_point().unwrap().value(), &[373.15]);
        }
    }

    #[test]
    fn test_measured_series_offset_by_prior_steps() {
        let mut assembler = StepAssembler::new(3, &[100.0, 200.0, 300.0]).unwrap();
        let rule = SHEET_SETPOINTS.lookup("Set Fil T").unwrap();
        assembler.apply_values(rule, &[800.0]).unwrap();

        let measured = TimeSeries::builder(Unit::DegreeCelsius)
            .measured(
                Series::new(vec![0.0, 120.0, 1800.0, 3000.0, 7200.0], vec![800.0; 5]).unwrap(),
            )
            .build()
            .unwrap();
        assembler
            .layer_measured(2, ChannelTarget::FilamentTemperature, measured)
            .unwrap();

        let steps = assembler.finish();
        let filament = steps[1].sample_parameters[0].filament_temperature.as_ref().unwrap();
        assert_close(
            filament.measured().unwrap().time(),
            &[100.0, 220.0, 1900.0, 3100.0, 7300.0],
        );
        // set point kept, anchored at the step start
        assert_close(filament.set_point().unwrap().time(), &[100.0]);
        assert!(steps[0].sample_parameters[0]
            .filament_temperature
            .as_ref()
            .unwrap()
            .measured()
            .is_none());
    }

    #[test]
    fn test_step_index_out_of_range() {
        let mut assembler = StepAssembler::new(2, &[1.0, 1.0]).unwrap();
        let series = set_point(0.0, 1.0, Unit::Millibar).unwrap();
        let err = assembler
            .layer_measured(3, ChannelTarget::ChamberPressure, series.clone())
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::StepIndexOutOfRange { index: 3, total: 2 }
        ));
        assert!(assembler
            .apply_at(0, ChannelTarget::ChamberPressure, series)
            .is_err());
    }

    #[test]
    fn test_dimension_checked() {
        let mut assembler = StepAssembler::new(1, &[1.0]).unwrap();
        let series = set_point(0.0, 1.0, Unit::Kelvin).unwrap();
        assert!(matches!(
            assembler.apply_at(1, ChannelTarget::ChamberPressure, series),
            Err(ParseError::UnitMismatch { .. })
        ));
    }

    #[test]
    fn test_step_starts() {
        let assembler = StepAssembler::new(3, &[10.0, 20.0, 30.0, 40.0]).unwrap();
        assert_eq!(assembler.step_starts(), &[0.0, 10.0, 30.0]);
        assert_eq!(assembler.total_steps(), 3);
    }
}
