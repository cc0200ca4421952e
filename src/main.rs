//! Chiltrix CX34 CLI
//!
//! A command-line interface (CLI) application for monitoring and controlling
//! Chiltrix CX34 heat pumps using Modbus RTU (serial) or Modbus TCP.
//!
//! This tool allows users to:
//! - Read the heat pump state with temperatures, flow and the derived COP.
//! - Dump every known register with its raw and decoded value, optionally as YAML.
//! - Set the heating, cooling and domestic hot water target temperatures.
//! - Switch the operating mode.
//! - Run in a continuous daemon mode that prints the state at a fixed interval.
//! - Validate captured Modbus RTU frames offline.
//!
//! The CLI leverages the `chilctl_lib` crate for protocol definitions and client operations.

use anyhow::{bail, Context, Result};
use chilctl_lib::{
    command::Setpoint,
    decode::Quantity,
    frame::{self, FrameLogger},
    metrics::Metrics,
    protocol::{self as proto, Mode},
    snapshot::Snapshot,
    tokio_sync_client::CX34,
    units::Temperature,
};
use clap::Parser;
use dialoguer::Confirm;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::io::{stdout, Write};
use std::{panic, time::Duration};

mod commandline;
mod config;

fn logging_init(loglevel: LevelFilter) -> Result<LoggerHandle> {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .context("Cannot init logging")?
        .start()
        .context("Cannot start logging")?;

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0));

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic",
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    Ok(log_handle)
}

/// Calculates the minimum recommended delay for Modbus RTU based on baud rate.
/// This is typically 3.5 character times.
fn minimum_rtu_delay(baud_rate: u32) -> Duration {
    // Modbus assumes 11 bits per character for silence intervals.
    let bits_per_char = 11.0;
    if baud_rate == 0 {
        return Duration::from_millis(16);
    }

    let char_time_secs = bits_per_char / f64::from(baud_rate);
    let inter_frame_delay_secs = 3.5 * char_time_secs;
    let delay_micros = (inter_frame_delay_secs * 1_000_000.0) as u64;

    // Fixed minimum silence above 19200 baud.
    const PRACTICAL_MIN_INTER_FRAME_DELAY_MICROS: u64 = 1_750;
    Duration::from_micros(delay_micros.max(PRACTICAL_MIN_INTER_FRAME_DELAY_MICROS))
}

/// Checks if the user-provided RTU delay is sufficient; if not, uses the calculated minimum.
fn check_rtu_delay(user_delay: Duration, baud_rate: u32) -> Duration {
    let min_rtu_delay = minimum_rtu_delay(baud_rate);
    if user_delay < min_rtu_delay {
        warn!(
            "User-defined RTU delay of {user_delay:?} is below the recommended minimum of {min_rtu_delay:?} for {baud_rate} baud. Using minimum."
        );
        min_rtu_delay
    } else {
        user_delay
    }
}

/// Creates a new CX34 client based on the provided command-line arguments.
fn create_client<'a>(
    connection: &'a commandline::CliConnection,
    timeout: Duration,
    delay: &mut Duration,
) -> Result<(CX34, &'a commandline::CliCommands)> {
    let (client, command_to_execute) = match connection {
        commandline::CliConnection::Tcp {
            address,
            unit,
            command,
        } => {
            let socket_addr = address
                .parse()
                .with_context(|| format!("Invalid TCP address format: '{address}'"))?;
            info!("Attempting to connect via TCP to {socket_addr} (Unit: {unit})...");
            let client = CX34::connect_tcp(socket_addr, *unit, timeout).with_context(|| {
                format!("Failed to connect to Modbus TCP device at {socket_addr}")
            })?;
            (client, command)
        }
        commandline::CliConnection::Rtu {
            device,
            baud_rate,
            unit,
            command,
        } => {
            info!(
                "Attempting to connect via RTU to device {device} (Unit: {unit}, Baud: {baud_rate})..."
            );
            *delay = check_rtu_delay(*delay, *baud_rate);
            let client = CX34::connect_rtu(device, *baud_rate, *unit, timeout)
                .with_context(|| format!("Cannot open serial port {device}"))?;
            (client, command)
        }
        commandline::CliConnection::Config { file, command } => {
            let config = config::ModbusConfig::load(file)?;
            info!(
                "Attempting to connect via RTU to device {} (Unit: {}, Baud: {})...",
                config.device, config.unit, config.baud_rate
            );
            *delay = check_rtu_delay(config.delay, config.baud_rate);
            let client =
                CX34::connect_rtu(&config.device, config.baud_rate, config.unit, config.timeout)
                    .with_context(|| format!("Cannot open serial port {}", config.device))?;
            (client, command)
        }
        commandline::CliConnection::DecodeFrame { .. } => {
            bail!("Decoding a frame does not need a connection")
        }
    };
    Ok((client, command_to_execute))
}

/// Prints the frame log line and the decoded content of a captured frame.
fn handle_decode_frame(bytes: &[u8]) -> Result<()> {
    let mut logger = FrameLogger::new(stdout());
    logger.write_all(bytes).context("Failed to write frame log")?;
    logger.flush().context("Failed to flush stdout")?;

    let frame = frame::decode_frame(bytes).context("Invalid frame")?;
    println!("Unit id:       {}", frame.unit_id);
    println!("Function code: {:#04x}", frame.function_code);
    if let Some(code) = frame.exception_code() {
        println!("Exception:     {code:#04x}");
    } else if let Ok(values) = frame.register_values() {
        println!("Registers:     {values:?}");
    } else {
        println!("Payload:       {}", hex::encode(&frame.payload));
    }
    Ok(())
}

fn print_report(snapshot: &Snapshot) -> Result<()> {
    let metrics = Metrics::from_snapshot(snapshot).context("Cannot derive metrics")?;
    let state = if !snapshot.is_on()? {
        "standby"
    } else if metrics.is_running() {
        "running"
    } else {
        "stopped"
    };

    println!("Mode:                {} ({state})", metrics.mode);
    println!("Cooling target:      {}", snapshot.cooling_target_temp()?);
    println!("Heating target:      {}", snapshot.heating_target_temp()?);
    println!("Hot water target:    {}", snapshot.dhw_target_temp()?);
    println!("Outlet water:        {}", snapshot.outlet_water_temp()?);
    println!("Inlet water:         {}", snapshot.inlet_water_temp()?);
    println!("Ambient:             {}", snapshot.ambient_temp()?);
    println!("Hot water tank:      {}", snapshot.dhw_tank_temp()?);
    println!(
        "Flow:                {} ({})",
        metrics.flow_rate, metrics.mass_flow
    );
    println!(
        "Pump speeds:         internal {}/10, booster {}/10",
        snapshot.internal_pump_speed()?,
        snapshot.booster_pump_speed()?
    );
    println!("Delta-T:             {}", metrics.delta_t);
    println!("Useful heat rate:    {}", metrics.explain_heat_rate());
    println!(
        "Apparent power:      {} ({} * {})",
        metrics.apparent_power,
        snapshot.ac_current()?,
        snapshot.ac_voltage()?
    );
    println!("COP:                 {}", metrics.cop());
    Ok(())
}

#[derive(Debug, serde::Serialize)]
struct RawRegister {
    address: u16,
    name: &'static str,
    raw: u16,
    value: Quantity,
    unit: &'static str,
    provisional: bool,
}

fn raw_registers(snapshot: &Snapshot) -> Result<Vec<RawRegister>> {
    snapshot
        .decode_all()
        .into_iter()
        .map(|(entry, value)| {
            Ok(RawRegister {
                address: entry.register.address(),
                name: entry.name,
                raw: snapshot.raw(entry.register)?,
                value,
                unit: entry.encoding.unit(),
                provisional: entry.provisional,
            })
        })
        .collect()
}

fn print_raw(snapshot: &Snapshot, yaml: bool) -> Result<()> {
    let registers = raw_registers(snapshot)?;
    if yaml {
        print!(
            "{}",
            serde_yaml::to_string(&registers).context("Cannot serialize registers")?
        );
        return Ok(());
    }
    for register in registers {
        println!(
            "{:>3} {:<36} {:>6}  {}{}",
            register.address,
            register.name,
            register.raw,
            register.value,
            if register.provisional {
                " (provisional)"
            } else {
                ""
            }
        );
    }
    Ok(())
}

fn handle_set_setpoint(
    client: &mut CX34,
    setpoint: Setpoint,
    temperature: Temperature,
    delay: Duration,
) -> Result<()> {
    info!("Executing: Set {setpoint} setpoint to {temperature}");
    client
        .set_setpoint(setpoint, temperature)
        .with_context(|| format!("Failed to set {setpoint} setpoint to {temperature}"))?;

    std::thread::sleep(delay);
    let register = setpoint.register();
    let snapshot = client
        .read_range(register, register)
        .with_context(|| format!("Cannot read back {setpoint} setpoint"))?;
    println!(
        "Target {setpoint} temperature is now {}",
        snapshot.decode(register)?
    );
    Ok(())
}

fn handle_set_mode(client: &mut CX34, mode: Mode, yes: bool, delay: Duration) -> Result<()> {
    info!("Executing: Set mode to {mode}");
    if !yes
        && !Confirm::new()
            .with_prompt(format!("Switch the heat pump to {mode} mode?"))
            .default(false)
            .show_default(true)
            .interact()?
    {
        info!("Setting the mode aborted by user.");
        return Ok(());
    }
    client
        .set_mode(mode)
        .with_context(|| format!("Failed to set mode to {mode}"))?;

    std::thread::sleep(delay);
    let snapshot = client
        .read_range(proto::Register::AC_MODE, proto::Register::AC_MODE)
        .context("Cannot read back mode")?;
    println!("Mode is now {}", snapshot.mode()?);
    Ok(())
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    // 1. Initialize logging as early as possible
    let _log_handle = logging_init(args.verbose.log_level_filter())?;
    info!(
        "chilctl started. Log level: {}",
        args.verbose.log_level_filter()
    );

    // 2. Frame decoding works offline
    if let commandline::CliConnection::DecodeFrame { frame } = &args.connection {
        return handle_decode_frame(&frame.0);
    }

    // 3. Setup for TCP/RTU commands
    let mut delay = args.delay;
    let (mut client, command_to_execute) =
        create_client(&args.connection, args.timeout, &mut delay)?;
    debug!("Request timeout: {:?}", client.timeout());

    // 4. Execute the command
    match command_to_execute {
        commandline::CliCommands::Daemon { poll_interval } => {
            info!("Starting daemon mode: interval={poll_interval:?}");
            loop {
                debug!("Daemon: Reading state...");
                match client.read_state() {
                    Ok(snapshot) => {
                        if let Err(error) = print_report(&snapshot) {
                            error!("Cannot print state: {error:#}");
                        }
                        println!();
                    }
                    Err(error) => error!("Read cycle failed: {error}"),
                }
                std::thread::sleep(delay.max(*poll_interval));
            }
        }
        commandline::CliCommands::Read => {
            info!("Executing: Read State");
            let snapshot = client.read_state().context("Cannot read state")?;
            print_report(&snapshot)?;
        }
        commandline::CliCommands::ReadRaw { yaml } => {
            info!("Executing: Read Raw Registers");
            let snapshot = client.read_state().context("Cannot read state")?;
            print_raw(&snapshot, *yaml)?;
        }
        commandline::CliCommands::SetMode { mode, yes } => {
            handle_set_mode(&mut client, *mode, *yes, delay)?;
        }
        commandline::CliCommands::SetHeatingTemp { temperature } => {
            handle_set_setpoint(&mut client, Setpoint::Heating, *temperature, delay)?;
        }
        commandline::CliCommands::SetCoolingTemp { temperature } => {
            handle_set_setpoint(&mut client, Setpoint::Cooling, *temperature, delay)?;
        }
        commandline::CliCommands::SetDhwTemp { temperature } => {
            handle_set_setpoint(&mut client, Setpoint::DomesticHotWater, *temperature, delay)?;
        }
    }

    Ok(())
}
