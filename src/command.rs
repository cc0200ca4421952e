//! Validating and encoding writes to the CX34.
//!
//! Every write is checked against the catalog entry of its target register
//! before anything goes on the wire.
use crate::{
    error::Result,
    protocol::{self as proto, CatalogEntry, Mode, Register},
    transport::RegisterTransport,
    units::Temperature,
};
use log::info;
use std::fmt;

/// A writable temperature setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setpoint {
    Cooling,
    Heating,
    /// Domestic hot water; the register mapping is provisional.
    DomesticHotWater,
}

impl Setpoint {
    pub fn register(&self) -> Register {
        match self {
            Setpoint::Cooling => Register::TARGET_COOLING_TEMP,
            Setpoint::Heating => Register::TARGET_HEATING_TEMP,
            Setpoint::DomesticHotWater => Register::TARGET_DHW_TEMP,
        }
    }
}

impl fmt::Display for Setpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setpoint::Cooling => write!(f, "cooling"),
            Setpoint::Heating => write!(f, "heating"),
            Setpoint::DomesticHotWater => write!(f, "domestic hot water"),
        }
    }
}

/// A single register write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Setpoint(Setpoint, Temperature),
    Mode(Mode),
}

impl Command {
    pub fn register(&self) -> Register {
        match self {
            Command::Setpoint(setpoint, _) => setpoint.register(),
            Command::Mode(_) => Register::AC_MODE,
        }
    }

    /// Validates the command and returns the raw value to write.
    ///
    /// Setpoints are checked against the register's range before they are
    /// rounded to whole degrees, so 4.9 °C is rejected rather than rounded up
    /// to a valid 5 °C.
    pub fn encode(&self) -> std::result::Result<u16, proto::Error> {
        match self {
            Command::Setpoint(setpoint, temperature) => {
                encode_celsius(catalog_entry(setpoint.register())?, *temperature)
            }
            Command::Mode(mode) => mode.encode(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Setpoint(setpoint, temperature) => {
                write!(f, "{setpoint} setpoint {temperature}")
            }
            Command::Mode(mode) => write!(f, "mode {mode}"),
        }
    }
}

fn catalog_entry(register: Register) -> std::result::Result<&'static CatalogEntry, proto::Error> {
    proto::lookup(register).ok_or(proto::Error::NotInCatalog { register })
}

/// Encodes a temperature for a Celsius register, scaled by its catalog entry.
pub fn encode_celsius(
    entry: &CatalogEntry,
    temperature: Temperature,
) -> std::result::Result<u16, proto::Error> {
    let celsius = temperature.celsius();
    let scale = f64::from(entry.encoding.scale());
    let (min, max) = (f64::from(entry.min) / scale, f64::from(entry.max) / scale);
    // NaN fails this check too.
    if !(min..=max).contains(&celsius) {
        return Err(proto::Error::OutOfRange {
            register: entry.register,
            value: celsius,
            min,
            max,
        });
    }
    Ok((celsius * scale).round() as i16 as u16)
}

/// Validates `command` and writes it with a single register write.
///
/// Nothing is written if validation fails.
pub fn write<T: RegisterTransport + ?Sized>(transport: &mut T, command: Command) -> Result<()> {
    let register = command.register();
    let raw = command.encode()?;
    transport.write_register(register, raw)?;
    info!("Set {command} (register {register} = {raw})");
    Ok(())
}
