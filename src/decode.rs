//! Decoding raw register values into physical quantities.
//!
//! Nothing here is cached: every accessor reads the raw word from the
//! [`Snapshot`] and converts it again, so a decoded value always belongs to
//! the snapshot it came from.
use crate::{
    protocol::{self as proto, CatalogEntry, Encoding, Mode, Register},
    snapshot::Snapshot,
    units::{Current, FlowRate, Temperature, Voltage},
};
use log::{debug, warn};
use std::fmt;

type Result<T> = std::result::Result<T, proto::Error>;

/// State of an on/off register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SwitchState {
    Off,
    On,
    Unknown(u16),
}

impl SwitchState {
    pub fn decode(raw: u16) -> Self {
        match raw {
            0 => SwitchState::Off,
            1 => SwitchState::On,
            _ => SwitchState::Unknown(raw),
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchState::Off => write!(f, "off"),
            SwitchState::On => write!(f, "on"),
            SwitchState::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

/// A decoded register value, tagged with its unit by its variant.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Quantity {
    Temperature(Temperature),
    FlowRate(FlowRate),
    Current(Current),
    Voltage(Voltage),
    Frequency(u16),
    Switch(SwitchState),
    Mode(Mode),
    Count(u16),
    Code(u16),
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Temperature(value) => write!(f, "{value}"),
            Quantity::FlowRate(value) => write!(f, "{value}"),
            Quantity::Current(value) => write!(f, "{value}"),
            Quantity::Voltage(value) => write!(f, "{value}"),
            Quantity::Frequency(value) => write!(f, "{value} Hz"),
            Quantity::Switch(value) => write!(f, "{value}"),
            Quantity::Mode(value) => write!(f, "{value}"),
            Quantity::Count(value) => write!(f, "{value}"),
            Quantity::Code(value) => write!(f, "{value:#06x}"),
        }
    }
}

/// Decodes `raw` according to the catalog `entry`.
///
/// Scaling and signedness come from the entry alone. Enumerated values
/// outside the known set are logged once and decode to their `Unknown`
/// variant, so one bad register never hides the others.
pub fn decode_raw(entry: &CatalogEntry, raw: u16) -> Quantity {
    let value = entry.scaled(raw);
    let quantity = match entry.encoding {
        Encoding::Mode => return Quantity::Mode(mode_decode(entry.register, raw)),
        Encoding::Switch => return Quantity::Switch(switch_decode(entry.register, raw)),
        Encoding::Celsius | Encoding::DeciCelsius => {
            Quantity::Temperature(Temperature::from_celsius(value))
        }
        Encoding::DeciLitersPerMinute => Quantity::FlowRate(FlowRate::from_liters_per_minute(value)),
        Encoding::DeciAmpere => Quantity::Current(Current::from_amperes(value)),
        Encoding::Volt => Quantity::Voltage(Voltage::from_volts(value)),
        Encoding::Hertz => Quantity::Frequency(raw),
        Encoding::Count => Quantity::Count(raw),
        Encoding::Code => Quantity::Code(raw),
    };
    if !entry.contains_raw(raw) {
        debug!(
            "Register {} value {} is outside the documented range {}..={}",
            entry.register,
            entry.raw_value(raw),
            entry.min,
            entry.max
        );
    }
    quantity
}

fn mode_decode(register: Register, raw: u16) -> Mode {
    let mode = Mode::decode(raw);
    if let Mode::Unknown(raw) = mode {
        warn!("Register {register} holds unknown mode value {raw}, decoding it as unknown");
    }
    mode
}

fn switch_decode(register: Register, raw: u16) -> SwitchState {
    let state = SwitchState::decode(raw);
    if let SwitchState::Unknown(raw) = state {
        warn!("Register {register} holds unknown switch value {raw}, decoding it as unknown");
    }
    state
}

fn catalog_entry(register: Register) -> Result<&'static CatalogEntry> {
    proto::lookup(register).ok_or(proto::Error::NotInCatalog { register })
}

impl Snapshot {
    /// Decodes a single register using its catalog entry.
    pub fn decode(&self, register: Register) -> Result<Quantity> {
        Ok(decode_raw(catalog_entry(register)?, self.raw(register)?))
    }

    /// Decodes every captured register that has a catalog entry, in address order.
    pub fn decode_all(&self) -> Vec<(&'static CatalogEntry, Quantity)> {
        self.registers()
            .filter_map(|(register, raw)| {
                proto::lookup(register).map(|entry| (entry, decode_raw(entry, raw)))
            })
            .collect()
    }

    /// Operating mode; unknown codes decode to [`Mode::Unknown`].
    pub fn mode(&self) -> Result<Mode> {
        Ok(mode_decode(
            Register::AC_MODE,
            self.raw(Register::AC_MODE)?,
        ))
    }

    /// Whether the unit is switched on. Standby and unknown states are not on.
    pub fn is_on(&self) -> Result<bool> {
        Ok(self.switch(Register::ON_OFF_MODE)? == SwitchState::On)
    }

    /// The raw value of `register` scaled by its catalog entry.
    fn scaled(&self, register: Register) -> Result<f64> {
        Ok(catalog_entry(register)?.scaled(self.raw(register)?))
    }

    fn temperature(&self, register: Register) -> Result<Temperature> {
        self.scaled(register).map(Temperature::from_celsius)
    }

    fn current(&self, register: Register) -> Result<Current> {
        self.scaled(register).map(Current::from_amperes)
    }

    fn switch(&self, register: Register) -> Result<SwitchState> {
        Ok(switch_decode(register, self.raw(register)?))
    }

    pub fn cooling_target_temp(&self) -> Result<Temperature> {
        self.temperature(Register::TARGET_COOLING_TEMP)
    }

    pub fn heating_target_temp(&self) -> Result<Temperature> {
        self.temperature(Register::TARGET_HEATING_TEMP)
    }

    /// Domestic hot water setpoint. The register mapping is provisional.
    pub fn dhw_target_temp(&self) -> Result<Temperature> {
        self.temperature(Register::TARGET_DHW_TEMP)
    }

    /// Water temperature at the outlet; documented range -30..97 °C.
    pub fn outlet_water_temp(&self) -> Result<Temperature> {
        self.temperature(Register::AC_OUTLET_WATER_TEMP)
    }

    /// Water temperature at the inlet; documented range -30..97 °C.
    pub fn inlet_water_temp(&self) -> Result<Temperature> {
        self.temperature(Register::WATER_INLET_TEMP_1)
    }

    pub fn ambient_temp(&self) -> Result<Temperature> {
        self.temperature(Register::AMBIENT_TEMP)
    }

    pub fn suction_temp(&self) -> Result<Temperature> {
        self.temperature(Register::SUCTION_TEMP)
    }

    /// Hot water tank temperature, if a tank sensor is connected.
    pub fn dhw_tank_temp(&self) -> Result<Temperature> {
        self.temperature(Register::DHW_TANK_TEMP)
    }

    /// Water flow measured by the unit's flow sensor.
    pub fn flow_rate(&self) -> Result<FlowRate> {
        self.scaled(Register::WATER_FLOW_RATE)
            .map(FlowRate::from_liters_per_minute)
    }

    /// Internal variable-speed pump setting, 1..=10 where 10 means 100%.
    pub fn internal_pump_speed(&self) -> Result<u16> {
        self.raw(Register::INTERNAL_PUMP_SPEED)
    }

    /// External booster pump setting, 1..=10 where 10 means 100%.
    pub fn booster_pump_speed(&self) -> Result<u16> {
        self.raw(Register::BOOSTER_PUMP_SPEED)
    }

    pub fn ac_voltage(&self) -> Result<Voltage> {
        self.scaled(Register::INPUT_AC_VOLTAGE).map(Voltage::from_volts)
    }

    pub fn ac_current(&self) -> Result<Current> {
        self.current(Register::INPUT_AC_CURRENT)
    }

    pub fn compressor_phase_current(&self) -> Result<Current> {
        self.current(Register::COMPRESSOR_PHASE_CURRENT)
    }

    pub fn inductor_ac_current(&self) -> Result<Current> {
        self.current(Register::INDUCTOR_AC_CURRENT)
    }

    pub fn high_pressure_switch(&self) -> Result<SwitchState> {
        self.switch(Register::HIGH_PRESSURE_SWITCH)
    }

    pub fn low_pressure_switch(&self) -> Result<SwitchState> {
        self.switch(Register::LOW_PRESSURE_SWITCH)
    }

    /// Fault code; observed as 32 while the controller shows a P5 error.
    pub fn fault_code(&self) -> Result<u16> {
        self.raw(Register::CURRENT_FAULT_CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{capture_logs, captured};
    use assert_matches::assert_matches;

    fn snapshot() -> Snapshot {
        Snapshot::from_values(&[
            (Register::ON_OFF_MODE, 1),
            (Register::AC_MODE, 1),
            (Register::TARGET_COOLING_TEMP, 12),
            (Register::TARGET_HEATING_TEMP, 39),
            (Register::TARGET_DHW_TEMP, 51),
            (Register::AMBIENT_TEMP, 49),
            (Register::AC_OUTLET_WATER_TEMP, 453),
            (Register::WATER_FLOW_RATE, 110),
            (Register::HIGH_PRESSURE_SWITCH, 0),
            (Register::INPUT_AC_VOLTAGE, 239),
            (Register::INPUT_AC_CURRENT, 55),
            (Register::WATER_INLET_TEMP_1, 399),
        ])
    }

    #[test]
    fn scaling_rules() {
        let snapshot = snapshot();
        assert_eq!(snapshot.heating_target_temp().unwrap().celsius(), 39.0);
        assert_eq!(snapshot.dhw_target_temp().unwrap().celsius(), 51.0);
        assert_eq!(snapshot.outlet_water_temp().unwrap().celsius(), 45.3);
        assert_eq!(snapshot.inlet_water_temp().unwrap().celsius(), 39.9);
        assert_eq!(snapshot.ambient_temp().unwrap().celsius(), 4.9);
        assert_eq!(snapshot.flow_rate().unwrap().liters_per_minute(), 11.0);
        assert_eq!(snapshot.ac_current().unwrap().amperes(), 5.5);
        assert_eq!(snapshot.ac_voltage().unwrap().volts(), 239.0);
        assert_eq!(snapshot.mode(), Ok(Mode::Heating));
        assert_eq!(snapshot.is_on(), Ok(true));
        assert_eq!(snapshot.high_pressure_switch(), Ok(SwitchState::Off));
    }

    #[test]
    fn negative_temperatures() {
        let snapshot = Snapshot::from_values(&[
            (Register::TARGET_COOLING_TEMP, 0xFFE2),
            (Register::AC_OUTLET_WATER_TEMP, 0xFF9C),
            (Register::AMBIENT_TEMP, 970),
        ]);
        assert_eq!(snapshot.cooling_target_temp().unwrap().celsius(), -30.0);
        assert_eq!(snapshot.outlet_water_temp().unwrap().celsius(), -10.0);
        assert_eq!(snapshot.ambient_temp().unwrap().celsius(), 97.0);
    }

    #[test]
    fn accessors_agree_with_decode() {
        let snapshot = snapshot();
        for (register, value) in [
            (
                Register::AC_OUTLET_WATER_TEMP,
                Quantity::Temperature(snapshot.outlet_water_temp().unwrap()),
            ),
            (
                Register::WATER_FLOW_RATE,
                Quantity::FlowRate(snapshot.flow_rate().unwrap()),
            ),
            (
                Register::INPUT_AC_CURRENT,
                Quantity::Current(snapshot.ac_current().unwrap()),
            ),
            (
                Register::INPUT_AC_VOLTAGE,
                Quantity::Voltage(snapshot.ac_voltage().unwrap()),
            ),
        ] {
            assert_eq!(snapshot.decode(register), Ok(value));
        }
    }

    #[test]
    fn missing_register_is_an_error() {
        let snapshot = snapshot();
        assert_matches!(
            snapshot.suction_temp(),
            Err(proto::Error::RegisterNotCaptured { register }) if register == Register::SUCTION_TEMP
        );
        assert_matches!(
            snapshot.decode(Register::try_from(7).unwrap()),
            Err(proto::Error::NotInCatalog { .. })
        );
    }

    #[test]
    fn decoding_is_pure() {
        let snapshot = snapshot();
        assert_eq!(snapshot.decode_all(), snapshot.decode_all());
        assert_eq!(snapshot.decode_all().len(), 12);
    }

    #[test]
    fn unknown_mode_decodes_to_sentinel_with_one_warning() {
        capture_logs();
        let snapshot = Snapshot::from_values(&[
            (Register::ON_OFF_MODE, 1),
            (Register::AC_MODE, 9),
            (Register::AC_OUTLET_WATER_TEMP, 453),
            (Register::INPUT_AC_VOLTAGE, 239),
        ]);
        let decoded = snapshot.decode_all();

        assert_eq!(captured(log::Level::Warn).len(), 1);
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[1].1, Quantity::Mode(Mode::Unknown(9)));
        assert_eq!(
            decoded[2].1,
            Quantity::Temperature(Temperature::from_celsius(45.3))
        );
        assert_eq!(decoded[3].1, Quantity::Voltage(Voltage::from_volts(239.0)));
    }

    #[test]
    fn unknown_switch_values_warn_in_every_accessor() {
        let snapshot = Snapshot::from_values(&[
            (Register::ON_OFF_MODE, 7),
            (Register::HIGH_PRESSURE_SWITCH, 5),
            (Register::LOW_PRESSURE_SWITCH, 2),
        ]);

        capture_logs();
        assert_eq!(snapshot.is_on(), Ok(false));
        assert_eq!(captured(log::Level::Warn).len(), 1);

        capture_logs();
        assert_eq!(snapshot.high_pressure_switch(), Ok(SwitchState::Unknown(5)));
        assert_eq!(captured(log::Level::Warn).len(), 1);

        capture_logs();
        assert_eq!(snapshot.low_pressure_switch(), Ok(SwitchState::Unknown(2)));
        assert_eq!(captured(log::Level::Warn).len(), 1);

        capture_logs();
        assert_eq!(
            snapshot.decode(Register::HIGH_PRESSURE_SWITCH),
            Ok(Quantity::Switch(SwitchState::Unknown(5)))
        );
        assert_eq!(captured(log::Level::Warn).len(), 1);
    }

    #[test]
    fn standby_is_not_on() {
        let snapshot = Snapshot::from_values(&[(Register::ON_OFF_MODE, 0)]);
        assert_eq!(snapshot.is_on(), Ok(false));
    }

    #[test]
    fn setpoint_register_round_trip() {
        let snapshot = Snapshot::from_values(&[(Register::TARGET_HEATING_TEMP, 35)]);
        assert_eq!(
            snapshot.decode(Register::TARGET_HEATING_TEMP),
            Ok(Quantity::Temperature(Temperature::from_celsius(35.0)))
        );
    }

    #[test]
    fn quantity_display() {
        assert_eq!(Quantity::Code(32).to_string(), "0x0020");
        assert_eq!(Quantity::Frequency(60).to_string(), "60 Hz");
        assert_eq!(Quantity::Switch(SwitchState::On).to_string(), "on");
        assert_eq!(
            Quantity::FlowRate(FlowRate::from_liters_per_minute(11.0)).to_string(),
            "11.0 l/min"
        );
    }
}
