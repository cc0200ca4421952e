//! Synchronous `tokio-modbus` transport for the CX34.
//!
//! A `tokio_modbus::client::sync::Context` implements [`RegisterTransport`],
//! so it can be handed to [`Snapshot::read_all`](crate::snapshot::Snapshot::read_all)
//! and [`command::write`](crate::command::write) directly.
//!
//! # Examples
//!
//! ```no_run
//! use chilctl_lib::{protocol as proto, snapshot::Snapshot, tokio_sync};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut ctx = tokio_sync::connect_rtu(
//!         "/dev/ttyUSB0",
//!         proto::BAUD_RATE,
//!         proto::FACTORY_DEFAULT_UNIT_ID,
//!         Duration::from_secs(10),
//!     )?;
//!     let snapshot = Snapshot::read_all(&mut ctx)?;
//!     println!("Outlet water: {}", snapshot.outlet_water_temp()?);
//!     Ok(())
//! }
//! ```
use crate::{
    error::TransportError, protocol as proto, tokio_common::map_tokio_result,
    transport::RegisterTransport,
};
use std::time::Duration;
use tokio_modbus::client::sync::Context;
use tokio_modbus::prelude::{SyncReader, SyncWriter};

impl RegisterTransport for Context {
    fn read_registers(
        &mut self,
        start: proto::Register,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let words = map_tokio_result(self.read_holding_registers(start.address(), count))?;
        if words.len() > usize::from(count) {
            return Err(TransportError::MalformedResponse(format!(
                "got {} registers, requested {count}",
                words.len()
            )));
        }
        Ok(words)
    }

    fn write_register(
        &mut self,
        register: proto::Register,
        value: u16,
    ) -> Result<(), TransportError> {
        map_tokio_result(self.write_single_register(register.address(), value))
    }
}

/// Opens the serial port and returns a context with `timeout` applied to every request.
///
/// # Arguments
///
/// * `device` - The path to the serial port device (e.g., `/dev/ttyUSB0`).
/// * `baud_rate` - The baud rate, normally [`proto::BAUD_RATE`].
/// * `unit` - The Modbus unit id, normally [`proto::FACTORY_DEFAULT_UNIT_ID`].
/// * `timeout` - How long to wait for each response.
#[cfg(feature = "tokio-rtu-sync")]
pub fn connect_rtu(
    device: &str,
    baud_rate: u32,
    unit: u8,
    timeout: Duration,
) -> Result<Context, TransportError> {
    let builder = crate::tokio_common::serial_port_builder(device, baud_rate);
    let mut ctx = tokio_modbus::client::sync::rtu::connect_slave(&builder, tokio_modbus::Slave(unit))?;
    ctx.set_timeout(timeout);
    Ok(ctx)
}

/// Connects to a Modbus TCP gateway in front of the CX34.
#[cfg(feature = "tokio-tcp-sync")]
pub fn connect_tcp(
    address: std::net::SocketAddr,
    unit: u8,
    timeout: Duration,
) -> Result<Context, TransportError> {
    let mut ctx = tokio_modbus::client::sync::tcp::connect_slave(address, tokio_modbus::Slave(unit))?;
    ctx.set_timeout(timeout);
    Ok(ctx)
}
