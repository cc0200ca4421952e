//! A synchronous CX34 client that owns its Modbus connection.
use crate::{
    command::{self, Command, Setpoint},
    error::Result,
    metrics::Metrics,
    protocol::{self as proto, Mode},
    snapshot::Snapshot,
    transport::RegisterTransport,
    units::Temperature,
};
use std::time::Duration;
use tokio_modbus::client::sync::Context;

/// Synchronous client for a Chiltrix CX34 heat pump.
///
/// The client exclusively owns its transport; dropping it closes the serial
/// port. It keeps no state between calls, every read returns a fresh
/// [`Snapshot`].
#[derive(Debug)]
pub struct CX34<T: RegisterTransport = Context> {
    transport: T,
}

impl CX34<Context> {
    /// Connects over RS485 with the CX34's serial settings.
    ///
    /// The `timeout` applies to every request of this client and cannot be
    /// changed afterwards.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use chilctl_lib::{protocol as proto, tokio_sync_client::CX34};
    /// use std::time::Duration;
    ///
    /// # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    /// let mut client = CX34::connect_rtu(
    ///     "/dev/ttyUSB0",
    ///     proto::BAUD_RATE,
    ///     proto::FACTORY_DEFAULT_UNIT_ID,
    ///     Duration::from_secs(10),
    /// )?;
    /// let metrics = client.read_metrics()?;
    /// println!("COP: {}", metrics.cop());
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "tokio-rtu-sync")]
    pub fn connect_rtu(device: &str, baud_rate: u32, unit: u8, timeout: Duration) -> Result<Self> {
        Ok(Self::new(crate::tokio_sync::connect_rtu(
            device, baud_rate, unit, timeout,
        )?))
    }

    /// Connects through a Modbus TCP gateway.
    #[cfg(feature = "tokio-tcp-sync")]
    pub fn connect_tcp(address: std::net::SocketAddr, unit: u8, timeout: Duration) -> Result<Self> {
        Ok(Self::new(crate::tokio_sync::connect_tcp(
            address, unit, timeout,
        )?))
    }

    /// The timeout fixed at connection time.
    pub fn timeout(&self) -> Option<Duration> {
        self.transport.timeout()
    }
}

impl<T: RegisterTransport> CX34<T> {
    /// Creates a client on an already connected transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Reads all holding registers.
    pub fn read_state(&mut self) -> Result<Snapshot> {
        Snapshot::read_all(&mut self.transport)
    }

    /// Reads the holding registers `first..=last`.
    pub fn read_range(&mut self, first: proto::Register, last: proto::Register) -> Result<Snapshot> {
        Snapshot::read_range(&mut self.transport, first, last)
    }

    /// Reads a fresh snapshot and derives its metrics.
    pub fn read_metrics(&mut self) -> Result<Metrics> {
        Ok(Metrics::from_snapshot(&self.read_state()?)?)
    }

    pub fn set_setpoint(&mut self, setpoint: Setpoint, temperature: Temperature) -> Result<()> {
        command::write(&mut self.transport, Command::Setpoint(setpoint, temperature))
    }

    /// Sets the target water temperature of heating mode, 5..=70 °C.
    pub fn set_heating_temp(&mut self, temperature: Temperature) -> Result<()> {
        self.set_setpoint(Setpoint::Heating, temperature)
    }

    /// Sets the target water temperature of cooling mode, 5..=70 °C.
    pub fn set_cooling_temp(&mut self, temperature: Temperature) -> Result<()> {
        self.set_setpoint(Setpoint::Cooling, temperature)
    }

    /// Sets the domestic hot water target temperature, 5..=70 °C.
    pub fn set_dhw_temp(&mut self, temperature: Temperature) -> Result<()> {
        self.set_setpoint(Setpoint::DomesticHotWater, temperature)
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        command::write(&mut self.transport, Command::Mode(mode))
    }
}
