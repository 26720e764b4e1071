//! Physical units used by the instrument formats and their canonical SI forms.
//!
//! Every quantity read from a file is tagged with a [`Unit`] at read time and
//! converted once to the canonical unit of its [`Dimension`] before storage.
//! The arithmetic is delegated to `uom`.

use crate::error::{ParseError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uom::si::f64::{
    Angle, AngularVelocity, ElectricCurrent, Energy, Frequency, Length, Power, Pressure, Ratio,
    ThermodynamicTemperature, Time, Volume, VolumeRate,
};
use uom::si::{
    angle, angular_velocity, electric_current, energy, frequency, length, power, pressure, ratio,
    thermodynamic_temperature, time, volume, volume_rate,
};

/// Physical dimension of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Time,
    Pressure,
    Temperature,
    VolumeRate,
    AngularVelocity,
    Current,
    Power,
    Frequency,
    Angle,
    Length,
    Energy,
    Dimensionless,
}

impl Dimension {
    /// SI unit values of this dimension are stored in
    pub fn canonical(self) -> Unit {
        match self {
            Dimension::Time => Unit::Second,
            Dimension::Pressure => Unit::Pascal,
            Dimension::Temperature => Unit::Kelvin,
            Dimension::VolumeRate => Unit::CubicMeterPerSecond,
            Dimension::AngularVelocity => Unit::RadianPerSecond,
            Dimension::Current => Unit::Ampere,
            Dimension::Power => Unit::Watt,
            Dimension::Frequency => Unit::Hertz,
            Dimension::Angle => Unit::Radian,
            Dimension::Length => Unit::Meter,
            Dimension::Energy => Unit::Joule,
            Dimension::Dimensionless => Unit::Dimensionless,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Second,
    Millisecond,
    Minute,
    Hour,
    Pascal,
    Hectopascal,
    Millibar,
    Bar,
    Torr,
    Kelvin,
    DegreeCelsius,
    CubicMeterPerSecond,
    CubicCentimeterPerMinute,
    LiterPerMinute,
    RadianPerSecond,
    RevolutionPerMinute,
    Ampere,
    Milliampere,
    Watt,
    Kilowatt,
    Hertz,
    Kilohertz,
    Radian,
    Degree,
    Meter,
    Millimeter,
    Micrometer,
    Nanometer,
    Joule,
    Millijoule,
    Dimensionless,
    Percent,
}

impl Unit {
    pub const ALL: [Unit; 32] = [
        Unit::Second,
        Unit::Millisecond,
        Unit::Minute,
        Unit::Hour,
        Unit::Pascal,
        Unit::Hectopascal,
        Unit::Millibar,
        Unit::Bar,
        Unit::Torr,
        Unit::Kelvin,
        Unit::DegreeCelsius,
        Unit::CubicMeterPerSecond,
        Unit::CubicCentimeterPerMinute,
        Unit::LiterPerMinute,
        Unit::RadianPerSecond,
        Unit::RevolutionPerMinute,
        Unit::Ampere,
        Unit::Milliampere,
        Unit::Watt,
        Unit::Kilowatt,
        Unit::Hertz,
        Unit::Kilohertz,
        Unit::Radian,
        Unit::Degree,
        Unit::Meter,
        Unit::Millimeter,
        Unit::Micrometer,
        Unit::Nanometer,
        Unit::Joule,
        Unit::Millijoule,
        Unit::Dimensionless,
        Unit::Percent,
    ];

    pub fn dimension(self) -> Dimension {
        use Unit::*;
        match self {
            Second | Millisecond | Minute | Hour => Dimension::Time,
            Pascal | Hectopascal | Millibar | Bar | Torr => Dimension::Pressure,
            Kelvin | DegreeCelsius => Dimension::Temperature,
            CubicMeterPerSecond | CubicCentimeterPerMinute | LiterPerMinute => {
                Dimension::VolumeRate
            }
            RadianPerSecond | RevolutionPerMinute => Dimension::AngularVelocity,
            Ampere | Milliampere => Dimension::Current,
            Watt | Kilowatt => Dimension::Power,
            Hertz | Kilohertz => Dimension::Frequency,
            Radian | Degree => Dimension::Angle,
            Meter | Millimeter | Micrometer | Nanometer => Dimension::Length,
            Joule | Millijoule => Dimension::Energy,
            Dimensionless | Percent => Dimension::Dimensionless,
        }
    }

    pub fn canonical(self) -> Unit {
        self.dimension().canonical()
    }

    pub fn symbol(self) -> &'static str {
        use Unit::*;
        match self {
            Second => "s",
            Millisecond => "ms",
            Minute => "min",
            Hour => "h",
            Pascal => "Pa",
            Hectopascal => "hPa",
            Millibar => "mbar",
            Bar => "bar",
            Torr => "Torr",
            Kelvin => "K",
            DegreeCelsius => "°C",
            CubicMeterPerSecond => "m^3/s",
            CubicCentimeterPerMinute => "cm^3/min",
            LiterPerMinute => "l/min",
            RadianPerSecond => "rad/s",
            RevolutionPerMinute => "rpm",
            Ampere => "A",
            Milliampere => "mA",
            Watt => "W",
            Kilowatt => "kW",
            Hertz => "Hz",
            Kilohertz => "kHz",
            Radian => "rad",
            Degree => "deg",
            Meter => "m",
            Millimeter => "mm",
            Micrometer => "um",
            Nanometer => "nm",
            Joule => "J",
            Millijoule => "mJ",
            Dimensionless => "1",
            Percent => "%",
        }
    }

    /// Convert a value expressed in this unit to the canonical unit.
    pub fn to_canonical(self, value: f64) -> f64 {
        use Unit::*;
        match self {
            Second => Time::new::<time::second>(value).get::<time::second>(),
            Millisecond => Time::new::<time::millisecond>(value).get::<time::second>(),
            Minute => Time::new::<time::minute>(value).get::<time::second>(),
            Hour => Time::new::<time::hour>(value).get::<time::second>(),
            Pascal => Pressure::new::<pressure::pascal>(value).get::<pressure::pascal>(),
            Hectopascal => Pressure::new::<pressure::hectopascal>(value).get::<pressure::pascal>(),
            Millibar => Pressure::new::<pressure::millibar>(value).get::<pressure::pascal>(),
            Bar => Pressure::new::<pressure::bar>(value).get::<pressure::pascal>(),
            Torr => Pressure::new::<pressure::torr>(value).get::<pressure::pascal>(),
            Kelvin => ThermodynamicTemperature::new::<thermodynamic_temperature::kelvin>(value)
                .get::<thermodynamic_temperature::kelvin>(),
            DegreeCelsius => {
                ThermodynamicTemperature::new::<thermodynamic_temperature::degree_celsius>(value)
                    .get::<thermodynamic_temperature::kelvin>()
            }
            CubicMeterPerSecond => VolumeRate::new::<volume_rate::cubic_meter_per_second>(value)
                .get::<volume_rate::cubic_meter_per_second>(),
            CubicCentimeterPerMinute => {
                let rate: VolumeRate = Volume::new::<volume::cubic_centimeter>(value)
                    / Time::new::<time::minute>(1.0);
                rate.get::<volume_rate::cubic_meter_per_second>()
            }
            LiterPerMinute => {
                let rate: VolumeRate =
                    Volume::new::<volume::liter>(value) / Time::new::<time::minute>(1.0);
                rate.get::<volume_rate::cubic_meter_per_second>()
            }
            RadianPerSecond => AngularVelocity::new::<angular_velocity::radian_per_second>(value)
                .get::<angular_velocity::radian_per_second>(),
            RevolutionPerMinute => {
                AngularVelocity::new::<angular_velocity::revolution_per_minute>(value)
                    .get::<angular_velocity::radian_per_second>()
            }
            Ampere => ElectricCurrent::new::<electric_current::ampere>(value)
                .get::<electric_current::ampere>(),
            Milliampere => ElectricCurrent::new::<electric_current::milliampere>(value)
                .get::<electric_current::ampere>(),
            Watt => Power::new::<power::watt>(value).get::<power::watt>(),
            Kilowatt => Power::new::<power::kilowatt>(value).get::<power::watt>(),
            Hertz => Frequency::new::<frequency::hertz>(value).get::<frequency::hertz>(),
            Kilohertz => Frequency::new::<frequency::kilohertz>(value).get::<frequency::hertz>(),
            Radian => Angle::new::<angle::radian>(value).get::<angle::radian>(),
            Degree => Angle::new::<angle::degree>(value).get::<angle::radian>(),
            Meter => Length::new::<length::meter>(value).get::<length::meter>(),
            Millimeter => Length::new::<length::millimeter>(value).get::<length::meter>(),
            Micrometer => Length::new::<length::micrometer>(value).get::<length::meter>(),
            Nanometer => Length::new::<length::nanometer>(value).get::<length::meter>(),
            Joule => Energy::new::<energy::joule>(value).get::<energy::joule>(),
            Millijoule => Energy::new::<energy::millijoule>(value).get::<energy::joule>(),
            Dimensionless => Ratio::new::<ratio::ratio>(value).get::<ratio::ratio>(),
            Percent => Ratio::new::<ratio::percent>(value).get::<ratio::ratio>(),
        }
    }

    /// Convert a canonical value back into this unit.
    pub fn from_canonical(self, value: f64) -> f64 {
        use Unit::*;
        match self {
            Second => Time::new::<time::second>(value).get::<time::second>(),
            Millisecond => Time::new::<time::second>(value).get::<time::millisecond>(),
            Minute => Time::new::<time::second>(value).get::<time::minute>(),
            Hour => Time::new::<time::second>(value).get::<time::hour>(),
            Pascal => Pressure::new::<pressure::pascal>(value).get::<pressure::pascal>(),
            Hectopascal => Pressure::new::<pressure::pascal>(value).get::<pressure::hectopascal>(),
            Millibar => Pressure::new::<pressure::pascal>(value).get::<pressure::millibar>(),
            Bar => Pressure::new::<pressure::pascal>(value).get::<pressure::bar>(),
            Torr => Pressure::new::<pressure::pascal>(value).get::<pressure::torr>(),
            Kelvin => ThermodynamicTemperature::new::<thermodynamic_temperature::kelvin>(value)
                .get::<thermodynamic_temperature::kelvin>(),
            DegreeCelsius => {
                ThermodynamicTemperature::new::<thermodynamic_temperature::kelvin>(value)
                    .get::<thermodynamic_temperature::degree_celsius>()
            }
            CubicMeterPerSecond => VolumeRate::new::<volume_rate::cubic_meter_per_second>(value)
                .get::<volume_rate::cubic_meter_per_second>(),
            CubicCentimeterPerMinute => {
                let per_minute: Volume =
                    VolumeRate::new::<volume_rate::cubic_meter_per_second>(value)
                        * Time::new::<time::minute>(1.0);
                per_minute.get::<volume::cubic_centimeter>()
            }
            LiterPerMinute => {
                let per_minute: Volume =
                    VolumeRate::new::<volume_rate::cubic_meter_per_second>(value)
                        * Time::new::<time::minute>(1.0);
                per_minute.get::<volume::liter>()
            }
            RadianPerSecond => AngularVelocity::new::<angular_velocity::radian_per_second>(value)
                .get::<angular_velocity::radian_per_second>(),
            RevolutionPerMinute => {
                AngularVelocity::new::<angular_velocity::radian_per_second>(value)
                    .get::<angular_velocity::revolution_per_minute>()
            }
            Ampere => ElectricCurrent::new::<electric_current::ampere>(value)
                .get::<electric_current::ampere>(),
            Milliampere => ElectricCurrent::new::<electric_current::ampere>(value)
                .get::<electric_current::milliampere>(),
            Watt => Power::new::<power::watt>(value).get::<power::watt>(),
            Kilowatt => Power::new::<power::watt>(value).get::<power::kilowatt>(),
            Hertz => Frequency::new::<frequency::hertz>(value).get::<frequency::hertz>(),
            Kilohertz => Frequency::new::<frequency::hertz>(value).get::<frequency::kilohertz>(),
            Radian => Angle::new::<angle::radian>(value).get::<angle::radian>(),
            Degree => Angle::new::<angle::radian>(value).get::<angle::degree>(),
            Meter => Length::new::<length::meter>(value).get::<length::meter>(),
            Millimeter => Length::new::<length::meter>(value).get::<length::millimeter>(),
            Micrometer => Length::new::<length::meter>(value).get::<length::micrometer>(),
            Nanometer => Length::new::<length::meter>(value).get::<length::nanometer>(),
            Joule => Energy::new::<energy::joule>(value).get::<energy::joule>(),
            Millijoule => Energy::new::<energy::joule>(value).get::<energy::millijoule>(),
            Dimensionless => Ratio::new::<ratio::ratio>(value).get::<ratio::ratio>(),
            Percent => Ratio::new::<ratio::ratio>(value).get::<ratio::percent>(),
        }
    }
}

/// Convert `value` from one unit to another of the same dimension.
pub fn convert(value: f64, from: Unit, to: Unit) -> Result<f64> {
    if from.dimension() != to.dimension() {
        return Err(ParseError::UnitMismatch {
            from: from.symbol().to_string(),
            to: to.symbol().to_string(),
        });
    }
    Ok(to.from_canonical(from.to_canonical(value)))
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = ParseError;

    /// Accepts the spellings found in instrument headers and unit annotations,
    /// e.g. `cm ** 3 / minute`, `sccm`, `degC`, `rpm`.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .replace("**", "^")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let unit = match normalized.as_str() {
            "s" | "sec" | "second" | "seconds" => Unit::Second,
            "ms" | "millisecond" => Unit::Millisecond,
            "min" | "minute" | "minutes" => Unit::Minute,
            "h" | "hour" | "hours" => Unit::Hour,
            "Pa" | "pascal" => Unit::Pascal,
            "hPa" => Unit::Hectopascal,
            "mbar" | "millibar" => Unit::Millibar,
            "bar" => Unit::Bar,
            "Torr" | "torr" => Unit::Torr,
            "K" | "kelvin" => Unit::Kelvin,
            "°C" | "degC" | "celsius" | "degree_Celsius" => Unit::DegreeCelsius,
            "m^3/s" | "meter^3/second" => Unit::CubicMeterPerSecond,
            "cm^3/min" | "cm^3/minute" | "centimeter^3/minute" | "sccm" | "ccm" | "ml/min" => {
                Unit::CubicCentimeterPerMinute
            }
            "l/min" | "L/min" | "slm" => Unit::LiterPerMinute,
            "rad/s" => Unit::RadianPerSecond,
            "rpm" => Unit::RevolutionPerMinute,
            "A" | "ampere" => Unit::Ampere,
            "mA" => Unit::Milliampere,
            "W" | "watt" => Unit::Watt,
            "kW" => Unit::Kilowatt,
            "Hz" | "hertz" => Unit::Hertz,
            "kHz" => Unit::Kilohertz,
            "rad" | "radian" => Unit::Radian,
            "deg" | "degree" | "°" => Unit::Degree,
            "m" | "meter" => Unit::Meter,
            "mm" => Unit::Millimeter,
            "um" | "µm" | "μm" | "micrometer" => Unit::Micrometer,
            "nm" => Unit::Nanometer,
            "J" | "joule" => Unit::Joule,
            "mJ" => Unit::Millijoule,
            "" | "1" | "dimensionless" => Unit::Dimensionless,
            "%" | "percent" => Unit::Percent,
            _ => {
                return Err(ParseError::UnknownUnit {
                    symbol: s.to_string(),
                });
            }
        };
        Ok(unit)
    }
}
