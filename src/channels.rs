//! Channel mapping tables.
//!
//! A table maps a channel code (a recipe header number or a sheet column
//! name) to exactly one slot of a [`ProcessStep`] and declares whether the
//! channel carries one value per step or a single value for all of them.

use crate::error::{ParseError, Result};
use crate::models::ProcessStep;
use crate::timeseries::TimeSeries;
use crate::units::{Dimension, Unit};
use std::collections::HashSet;

/// Position of the oxygen gas line in a MOVPE step's sources
pub const OXYGEN: usize = 0;
/// Position of flash evaporator 1
pub const FE1: usize = 1;
/// Position of flash evaporator 2
pub const FE2: usize = 2;

/// Field of a process step a channel writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelTarget {
    UniformGasFlow,
    ChamberPressure,
    ThrottleValve,
    Rotation,
    FilamentTemperature,
    ShaftTemperature,
    SourceTemperature(usize),
    SourcePressure(usize),
    SourceTotalFlow(usize),
    CarrierPushFlow(usize),
    CarrierPurgeFlow(usize),
    PumpFlux(usize),
}

impl ChannelTarget {
    pub fn dimension(self) -> Dimension {
        use ChannelTarget::*;
        match self {
            UniformGasFlow | SourceTotalFlow(_) | CarrierPushFlow(_) | CarrierPurgeFlow(_)
            | PumpFlux(_) => Dimension::VolumeRate,
            ChamberPressure | SourcePressure(_) => Dimension::Pressure,
            ThrottleValve => Dimension::Dimensionless,
            Rotation => Dimension::AngularVelocity,
            FilamentTemperature | ShaftTemperature | SourceTemperature(_) => {
                Dimension::Temperature
            }
        }
    }

    /// Dotted path of the field, for log messages
    pub fn path(self) -> String {
        use ChannelTarget::*;
        match self {
            UniformGasFlow => "environment.uniform_gas_flow_rate".to_string(),
            ChamberPressure => "environment.pressure".to_string(),
            ThrottleValve => "environment.throttle_valve".to_string(),
            Rotation => "environment.rotation".to_string(),
            FilamentTemperature => "sample_parameters[0].filament_temperature".to_string(),
            ShaftTemperature => "sample_parameters[0].shaft_temperature".to_string(),
            SourceTemperature(i) => format!("sources[{i}].vapor_source.temperature"),
            SourcePressure(i) => format!("sources[{i}].vapor_source.pressure"),
            SourceTotalFlow(i) => format!("sources[{i}].vapor_source.total_flow_rate"),
            CarrierPushFlow(i) => format!("sources[{i}].vapor_source.carrier_push_flow_rate"),
            CarrierPurgeFlow(i) => format!("sources[{i}].vapor_source.carrier_purge_flow_rate"),
            PumpFlux(i) => format!("sources[{i}].peristaltic_pump_flux"),
        }
    }

    /// The slot inside `step`, or `None` when the step lacks the source or
    /// sample-parameter entry the target points into.
    pub fn slot_mut(self, step: &mut ProcessStep) -> Option<&mut Option<TimeSeries>> {
        use ChannelTarget::*;
        match self {
            UniformGasFlow => Some(&mut step.environment.uniform_gas_flow_rate),
            ChamberPressure => Some(&mut step.environment.pressure),
            ThrottleValve => Some(&mut step.environment.throttle_valve),
            Rotation => Some(&mut step.environment.rotation),
            FilamentTemperature => step
                .sample_parameters
                .first_mut()
                .map(|parameters| &mut parameters.filament_temperature),
            ShaftTemperature => step
                .sample_parameters
                .first_mut()
                .map(|parameters| &mut parameters.shaft_temperature),
            SourceTemperature(i) => step
                .sources
                .get_mut(i)
                .map(|source| &mut source.vapor_source.temperature),
            SourcePressure(i) => step
                .sources
                .get_mut(i)
                .map(|source| &mut source.vapor_source.pressure),
            SourceTotalFlow(i) => step
                .sources
                .get_mut(i)
                .map(|source| &mut source.vapor_source.total_flow_rate),
            CarrierPushFlow(i) => step
                .sources
                .get_mut(i)
                .map(|source| &mut source.vapor_source.carrier_push_flow_rate),
            CarrierPurgeFlow(i) => step
                .sources
                .get_mut(i)
                .map(|source| &mut source.vapor_source.carrier_purge_flow_rate),
            PumpFlux(i) => step
                .sources
                .get_mut(i)
                .map(|source| &mut source.peristaltic_pump_flux),
        }
    }
}

/// How a channel's values are spread over the steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    /// Value *i* belongs to step *i*
    Indexed,
    /// One value repeated on every step
    Broadcast,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelRule {
    pub code: &'static str,
    pub target: ChannelTarget,
    pub unit: Unit,
    pub population: Population,
}

const fn indexed(code: &'static str, target: ChannelTarget, unit: Unit) -> ChannelRule {
    ChannelRule {
        code,
        target,
        unit,
        population: Population::Indexed,
    }
}

const fn broadcast(code: &'static str, target: ChannelTarget, unit: Unit) -> ChannelRule {
    ChannelRule {
        code,
        target,
        unit,
        population: Population::Broadcast,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChannelTable {
    name: &'static str,
    rules: &'static [ChannelRule],
}

impl ChannelTable {
    pub const fn new(name: &'static str, rules: &'static [ChannelRule]) -> Self {
        Self { name, rules }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn rules(&self) -> &'static [ChannelRule] {
        self.rules
    }

    pub fn lookup(&self, code: &str) -> Option<&'static ChannelRule> {
        self.rules.iter().find(|rule| rule.code == code)
    }

    /// Codes must be unique and each rule's unit must measure what its
    /// target stores.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for rule in self.rules {
            if !seen.insert(rule.code) {
                return Err(ParseError::configuration(format!(
                    "channel table '{}' maps code '{}' twice",
                    self.name, rule.code
                )));
            }
            if rule.unit.dimension() != rule.target.dimension() {
                return Err(ParseError::UnitMismatch {
                    from: rule.unit.symbol().to_string(),
                    to: rule.target.dimension().canonical().symbol().to_string(),
                });
            }
        }
        Ok(())
    }
}

use ChannelTarget::*;

/// Header codes of the MOVPE recipe log
pub static RECIPE_CHANNELS: ChannelTable = ChannelTable::new(
    "recipe",
    &[
        indexed("3", UniformGasFlow, Unit::CubicCentimeterPerMinute),
        indexed("6", SourceTotalFlow(OXYGEN), Unit::CubicCentimeterPerMinute),
        indexed("9", CarrierPushFlow(FE1), Unit::CubicCentimeterPerMinute),
        indexed("12", CarrierPurgeFlow(FE1), Unit::CubicCentimeterPerMinute),
        indexed("15", SourceTemperature(FE1), Unit::DegreeCelsius),
        indexed("17", FilamentTemperature, Unit::DegreeCelsius),
        indexed("19", ShaftTemperature, Unit::DegreeCelsius),
        indexed("21", Rotation, Unit::RevolutionPerMinute),
        indexed("23", ChamberPressure, Unit::Millibar),
        indexed("26", SourceTemperature(FE2), Unit::DegreeCelsius),
        indexed("28", CarrierPushFlow(FE2), Unit::CubicCentimeterPerMinute),
        indexed("31", CarrierPurgeFlow(FE2), Unit::CubicCentimeterPerMinute),
        indexed("34", PumpFlux(FE1), Unit::CubicCentimeterPerMinute),
        indexed("36", PumpFlux(FE2), Unit::CubicCentimeterPerMinute),
    ],
);

/// Set-point columns of the MOVPE growth sheet
pub static SHEET_SETPOINTS: ChannelTable = ChannelTable::new(
    "growth sheet",
    &[
        broadcast("Set of argon uniform gas", UniformGasFlow, Unit::CubicCentimeterPerMinute),
        broadcast(
            "Set of Oxygen uniform gas",
            SourceTotalFlow(OXYGEN),
            Unit::CubicCentimeterPerMinute,
        ),
        broadcast("Set Fil T", FilamentTemperature, Unit::DegreeCelsius),
        broadcast("Set Shaft T", ShaftTemperature, Unit::DegreeCelsius),
        broadcast("Set Chamber P", ChamberPressure, Unit::Millibar),
        broadcast("Set Rotation S", Rotation, Unit::RevolutionPerMinute),
        broadcast("Set FE1 Temp", SourceTemperature(FE1), Unit::DegreeCelsius),
        broadcast("Set FE2 Temp", SourceTemperature(FE2), Unit::DegreeCelsius),
        broadcast("Set Ar Push 1", CarrierPushFlow(FE1), Unit::CubicCentimeterPerMinute),
        broadcast("Set Ar Push 2", CarrierPushFlow(FE2), Unit::CubicCentimeterPerMinute),
        broadcast("Set Ar Purge 1", CarrierPurgeFlow(FE1), Unit::CubicCentimeterPerMinute),
        broadcast("Set Ar Purge 2", CarrierPurgeFlow(FE2), Unit::CubicCentimeterPerMinute),
    ],
);

/// A measured reading group of the growth sheet (`value`, `value.1`, ...)
/// with its optional per-checkpoint time columns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredGroup {
    pub time_column: &'static str,
    pub value_column: &'static str,
    pub target: ChannelTarget,
    pub unit: Unit,
}

const fn measured(
    time_column: &'static str,
    value_column: &'static str,
    target: ChannelTarget,
    unit: Unit,
) -> MeasuredGroup {
    MeasuredGroup {
        time_column,
        value_column,
        target,
        unit,
    }
}

/// Readings the deposition step carries on top of its set points
pub static SHEET_MEASURED: &[MeasuredGroup] = &[
    measured("Fil time", "Read Fil T", FilamentTemperature, Unit::DegreeCelsius),
    measured("Shaft time", "Read Shaft T", ShaftTemperature, Unit::DegreeCelsius),
    measured(
        "Chamber pressure time",
        "Read Chamber Pressure",
        ChamberPressure,
        Unit::Millibar,
    ),
    measured("TV time", "Read throttle valve", ThrottleValve, Unit::Percent),
    measured("rot time", "Read rotation", Rotation, Unit::RevolutionPerMinute),
    measured("BP FE1 time", "BP FE1", SourcePressure(FE1), Unit::Millibar),
    measured("BP FE2 time", "BP FE2", SourcePressure(FE2), Unit::Millibar),
    measured("Oxygen time", "Read Oxygen T", SourceTemperature(OXYGEN), Unit::DegreeCelsius),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_validate() {
        RECIPE_CHANNELS.validate().unwrap();
        SHEET_SETPOINTS.validate().unwrap();
        for group in SHEET_MEASURED {
            assert_eq!(group.unit.dimension(), group.target.dimension(), "{}", group.value_column);
        }
    }

    #[test]
    fn test_validate_rejects_duplicate_codes() {
        static RULES: [ChannelRule; 2] = [
            indexed("3", UniformGasFlow, Unit::CubicCentimeterPerMinute),
            indexed("3", Rotation, Unit::RevolutionPerMinute),
        ];
        let table = ChannelTable::new("broken", &RULES);
        assert!(matches!(
            table.validate(),
            Err(ParseError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_wrong_dimension() {
        static RULES: [ChannelRule; 1] = [indexed("23", ChamberPressure, Unit::Kelvin)];
        let table = ChannelTable::new("broken", &RULES);
        assert!(matches!(
            table.validate(),
            Err(ParseError::UnitMismatch { .. })
        ));
    }

    #[test]
    fn test_lookup() {
        let rule = RECIPE_CHANNELS.lookup("17").unwrap();
        assert_eq!(rule.target, FilamentTemperature);
        assert_eq!(rule.population, Population::Indexed);
        assert!(RECIPE_CHANNELS.lookup("99").is_none());
        assert_eq!(
            SHEET_SETPOINTS.lookup("Set Chamber P").unwrap().population,
            Population::Broadcast
        );
    }

    #[test]
    fn test_throttle_valve_reading_is_stored_as_ratio() {
        let group = SHEET_MEASURED
            .iter()
            .find(|group| group.target == ThrottleValve)
            .unwrap();
        assert_eq!(group.unit, Unit::Percent);
        assert!((group.unit.to_canonical(45.0) - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_slot_mut_reaches_every_target() {
        let mut step = ProcessStep::movpe(1, Some(10.0));
        for rule in RECIPE_CHANNELS.rules().iter().chain(SHEET_SETPOINTS.rules()) {
            assert!(rule.target.slot_mut(&mut step).is_some(), "{}", rule.target.path());
        }

        let mut bare = ProcessStep::default();
        assert!(SourceTemperature(FE2).slot_mut(&mut bare).is_none());
        assert!(FilamentTemperature.slot_mut(&mut bare).is_none());
        assert!(Rotation.slot_mut(&mut bare).is_some());
    }
}
