//! Physical quantities decoded from CX34 registers.
//!
//! Each type wraps an `f64` in a fixed base unit, so a value never travels
//! without the unit it is expressed in.
use std::fmt;
use std::ops::{Mul, Sub};

/// A temperature, stored in degrees Celsius (°C).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Temperature(f64);

impl Temperature {
    pub const fn from_celsius(celsius: f64) -> Self {
        Self(celsius)
    }

    pub fn from_fahrenheit(fahrenheit: f64) -> Self {
        Self((fahrenheit - 32.0) * 5.0 / 9.0)
    }

    pub const fn celsius(&self) -> f64 {
        self.0
    }

    pub fn fahrenheit(&self) -> f64 {
        self.0 * 9.0 / 5.0 + 32.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} °C ({:.1} °F)", self.celsius(), self.fahrenheit())
    }
}

/// A signed temperature difference in Kelvin.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TemperatureDelta(f64);

impl TemperatureDelta {
    pub const fn from_kelvin(kelvin: f64) -> Self {
        Self(kelvin)
    }

    pub const fn kelvin(&self) -> f64 {
        self.0
    }
}

impl Sub for Temperature {
    type Output = TemperatureDelta;

    fn sub(self, rhs: Self) -> TemperatureDelta {
        TemperatureDelta(self.0 - rhs.0)
    }
}

impl fmt::Display for TemperatureDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} K", self.0)
    }
}

/// A volumetric flow rate, stored in liters per minute.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FlowRate(f64);

impl FlowRate {
    pub const fn from_liters_per_minute(liters_per_minute: f64) -> Self {
        Self(liters_per_minute)
    }

    pub const fn liters_per_minute(&self) -> f64 {
        self.0
    }

    pub fn cubic_meters_per_second(&self) -> f64 {
        self.0 / 1000.0 / 60.0
    }
}

impl fmt::Display for FlowRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} l/min", self.0)
    }
}

/// A mass flow rate in kilograms per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MassFlow(f64);

impl MassFlow {
    pub const fn from_kilograms_per_second(kilograms_per_second: f64) -> Self {
        Self(kilograms_per_second)
    }

    pub const fn kilograms_per_second(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for MassFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} kg/s", self.0)
    }
}

/// An electrical current in amperes.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Current(f64);

impl Current {
    pub const fn from_amperes(amperes: f64) -> Self {
        Self(amperes)
    }

    pub const fn amperes(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Current {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} A", self.0)
    }
}

/// An electrical potential in volts.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Voltage(f64);

impl Voltage {
    pub const fn from_volts(volts: f64) -> Self {
        Self(volts)
    }

    pub const fn volts(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Voltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0} V", self.0)
    }
}

/// A power in watts. Negative values mean heat removed from the water loop.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Power(f64);

impl Power {
    pub const fn from_watts(watts: f64) -> Self {
        Self(watts)
    }

    pub const fn watts(&self) -> f64 {
        self.0
    }

    pub fn kilowatts(&self) -> f64 {
        self.0 / 1000.0
    }
}

/// Apparent power: current times voltage, without any power factor.
impl Mul<Voltage> for Current {
    type Output = Power;

    fn mul(self, rhs: Voltage) -> Power {
        Power(self.0 * rhs.0)
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} W", self.0)
    }
}
