//! A library for monitoring and controlling Chiltrix CX34 heat pumps via Modbus.
//!
//! The CX34 exposes its sensors and settings as holding registers 1 to 350.
//! This crate reads them in bounded chunks into a [`snapshot::Snapshot`],
//! decodes the raw words into physical quantities, derives the coefficient of
//! performance from a single snapshot, and validates setpoint and mode writes
//! before they reach the device.
//!
//! ## Features
//!
//! - **Register Catalog**: Names, encodings and documented ranges of every known register.
//! - **Consistent Snapshots**: A read cycle either yields a complete snapshot or an error.
//! - **Derived Metrics**: Temperature rise, useful heat rate, apparent power and COP.
//! - **Validated Writes**: Out-of-range setpoints never reach the wire.
//! - **Frame Diagnostics**: CRC validation and annotated logging of raw RTU frames.
//!
//! ## Quick Start
//!
//! ```no_run
//! use chilctl_lib::{protocol as proto, tokio_sync_client::CX34, units::Temperature};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = CX34::connect_rtu(
//!         "/dev/ttyUSB0",
//!         proto::BAUD_RATE,
//!         proto::FACTORY_DEFAULT_UNIT_ID,
//!         Duration::from_secs(10),
//!     )?;
//!
//!     let snapshot = client.read_state()?;
//!     println!("Mode: {}", snapshot.mode()?);
//!     println!("Outlet water: {}", snapshot.outlet_water_temp()?);
//!
//!     client.set_heating_temp(Temperature::from_celsius(40.0))?;
//!     Ok(())
//! }
//! ```
//!
//! Anything implementing [`transport::RegisterTransport`] can stand in for
//! the Modbus connection.

pub mod command;
pub mod decode;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod protocol;
pub mod snapshot;
pub mod transport;
pub mod units;

#[cfg(test)]
mod testing;

#[cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync"))]
pub mod tokio_common;

#[cfg_attr(
    docsrs,
    doc(cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync")))
)]
#[cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync"))]
pub mod tokio_sync;

#[cfg_attr(
    docsrs,
    doc(cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync")))
)]
#[cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync"))]
pub mod tokio_sync_client;
