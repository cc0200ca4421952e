//! Quantities derived from a single snapshot: temperature rise, heat rate and COP.
use crate::{
    protocol::{self as proto, Mode},
    snapshot::Snapshot,
    units::{FlowRate, MassFlow, Power, TemperatureDelta},
};
use std::fmt;

/// Density of water in kg/m³.
pub const WATER_DENSITY: f64 = 997.0;

/// Specific heat capacity of water in J/(kg·K).
pub const SPECIFIC_HEAT: f64 = 4000.0;

/// Coefficient of performance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Cop {
    Available(f64),
    /// The compressor draws no power, so a ratio is meaningless.
    Unavailable,
}

impl fmt::Display for Cop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cop::Available(cop) => write!(f, "{cop:.2}"),
            Cop::Unavailable => write!(f, "n/a (stopped)"),
        }
    }
}

/// Derived values of one snapshot.
///
/// Every input is taken from the same snapshot, so a mode change between two
/// read cycles can never pair a cooling heat rate with a heating sign.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Metrics {
    pub delta_t: TemperatureDelta,
    pub flow_rate: FlowRate,
    pub mass_flow: MassFlow,
    pub useful_heat_rate: Power,
    /// Current times voltage; the power factor is not known.
    pub apparent_power: Power,
    pub mode: Mode,
}

impl Metrics {
    /// Computes the metrics of `snapshot`.
    ///
    /// Fails with `RegisterNotCaptured` if one of the inlet, outlet, flow,
    /// voltage, current or mode registers is missing.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, proto::Error> {
        let delta_t = snapshot.outlet_water_temp()? - snapshot.inlet_water_temp()?;
        let flow_rate = snapshot.flow_rate()?;
        let mass_flow = mass_flow(flow_rate);
        Ok(Self {
            delta_t,
            flow_rate,
            mass_flow,
            useful_heat_rate: useful_heat_rate(mass_flow, delta_t),
            apparent_power: snapshot.ac_current()? * snapshot.ac_voltage()?,
            mode: snapshot.mode()?,
        })
    }

    pub fn cop(&self) -> Cop {
        coefficient_of_performance(self.useful_heat_rate, self.apparent_power, self.mode)
    }

    /// Whether the unit draws any power at all.
    pub fn is_running(&self) -> bool {
        self.apparent_power.watts() != 0.0
    }

    /// Renders the heat rate calculation step by step.
    pub fn explain_heat_rate(&self) -> String {
        format!(
            "{:.4}kg/s * {:.1}K * {:.1}kJ/(kg * K) = {:.0}J/s = {:.2}kW",
            self.mass_flow.kilograms_per_second(),
            self.delta_t.kelvin(),
            SPECIFIC_HEAT / 1000.0,
            self.useful_heat_rate.watts(),
            self.useful_heat_rate.kilowatts(),
        )
    }
}

pub fn mass_flow(flow_rate: FlowRate) -> MassFlow {
    MassFlow::from_kilograms_per_second(flow_rate.cubic_meters_per_second() * WATER_DENSITY)
}

/// Heat moved by the water per second. Negative while the water is cooled.
pub fn useful_heat_rate(mass_flow: MassFlow, delta_t: TemperatureDelta) -> Power {
    Power::from_watts(mass_flow.kilograms_per_second() * SPECIFIC_HEAT * delta_t.kelvin())
}

fn coefficient_of_performance(heat: Power, power: Power, mode: Mode) -> Cop {
    if power.watts() == 0.0 {
        return Cop::Unavailable;
    }
    let cop = heat.watts() / power.watts();
    if mode.is_cooling() {
        Cop::Available(-cop)
    } else {
        Cop::Available(cop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Register;
    use assert_matches::assert_matches;

    fn running(mode: u16, outlet: u16, inlet: u16) -> Snapshot {
        Snapshot::from_values(&[
            (Register::AC_MODE, mode),
            (Register::AC_OUTLET_WATER_TEMP, outlet),
            (Register::WATER_INLET_TEMP_1, inlet),
            (Register::WATER_FLOW_RATE, 120),
            (Register::INPUT_AC_VOLTAGE, 240),
            (Register::INPUT_AC_CURRENT, 50),
        ])
    }

    #[test]
    fn cop_is_heat_over_power() {
        assert_eq!(
            coefficient_of_performance(
                Power::from_watts(3000.0),
                Power::from_watts(1000.0),
                Mode::Heating
            ),
            Cop::Available(3.0)
        );
    }

    #[test]
    fn cooling_flips_the_sign() {
        assert_eq!(
            coefficient_of_performance(
                Power::from_watts(-3000.0),
                Power::from_watts(1000.0),
                Mode::Cooling
            ),
            Cop::Available(3.0)
        );
        // Only pure cooling flips the sign.
        assert_eq!(
            coefficient_of_performance(
                Power::from_watts(-3000.0),
                Power::from_watts(1000.0),
                Mode::CoolDhw
            ),
            Cop::Available(-3.0)
        );
    }

    #[test]
    fn zero_power_has_no_cop() {
        assert_eq!(
            coefficient_of_performance(
                Power::from_watts(3000.0),
                Power::from_watts(0.0),
                Mode::Heating
            ),
            Cop::Unavailable
        );
    }

    #[test]
    fn metrics_of_a_heating_snapshot() {
        let metrics = Metrics::from_snapshot(&running(1, 400, 350)).unwrap();
        assert!((metrics.delta_t.kelvin() - 5.0).abs() < 1e-9);
        // 12 l/min is 0.2 l/s.
        assert!((metrics.mass_flow.kilograms_per_second() - 0.1994).abs() < 1e-9);
        assert!((metrics.useful_heat_rate.watts() - 3988.0).abs() < 1e-6);
        assert_eq!(metrics.apparent_power, Power::from_watts(1200.0));
        assert!(metrics.is_running());
        assert_matches!(metrics.cop(), Cop::Available(cop) if (cop - 3988.0 / 1200.0).abs() < 1e-9);
        assert_eq!(
            metrics.explain_heat_rate(),
            "0.1994kg/s * 5.0K * 4.0kJ/(kg * K) = 3988J/s = 3.99kW"
        );
    }

    #[test]
    fn metrics_of_a_cooling_snapshot() {
        let metrics = Metrics::from_snapshot(&running(0, 120, 170)).unwrap();
        assert!(metrics.useful_heat_rate.watts() < 0.0);
        assert_matches!(metrics.cop(), Cop::Available(cop) if cop > 0.0);
    }

    #[test]
    fn stopped_unit() {
        let snapshot = Snapshot::from_values(&[
            (Register::AC_MODE, 1),
            (Register::AC_OUTLET_WATER_TEMP, 300),
            (Register::WATER_INLET_TEMP_1, 300),
            (Register::WATER_FLOW_RATE, 0),
            (Register::INPUT_AC_VOLTAGE, 240),
            (Register::INPUT_AC_CURRENT, 0),
        ]);
        let metrics = Metrics::from_snapshot(&snapshot).unwrap();
        assert!(!metrics.is_running());
        assert_eq!(metrics.cop(), Cop::Unavailable);
        assert_eq!(metrics.cop().to_string(), "n/a (stopped)");
    }

    #[test]
    fn missing_input_register() {
        let snapshot = Snapshot::from_values(&[(Register::AC_MODE, 1)]);
        assert_matches!(
            Metrics::from_snapshot(&snapshot),
            Err(proto::Error::RegisterNotCaptured { .. })
        );
    }
}
