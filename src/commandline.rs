use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use chilctl_lib::{protocol as proto, units::Temperature};
use std::path::PathBuf;
use std::time::Duration;

pub fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

fn parse_unit(s: &str) -> Result<u8, String> {
    let unit = clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid unit id format: {e}"))?;
    if (1..=247).contains(&unit) {
        Ok(unit)
    } else {
        Err(format!("Unit id {unit} is out of range 1..=247"))
    }
}

fn parse_mode(s: &str) -> Result<proto::Mode, String> {
    s.parse::<proto::Mode>().map_err(|e| e.to_string())
}

/// Parses `35`, `35C` or `95F`; a bare number is taken as degrees Celsius.
pub fn parse_temperature(s: &str) -> Result<Temperature, String> {
    let s = s.trim();
    let (number, fahrenheit) = match s.char_indices().last() {
        Some((index, 'C' | 'c')) => (&s[..index], false),
        Some((index, 'F' | 'f')) => (&s[..index], true),
        _ => (s, false),
    };
    let value = number
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("Invalid temperature '{s}': {e}"))?;
    if !value.is_finite() {
        return Err(format!("Invalid temperature '{s}'"));
    }
    Ok(if fahrenheit {
        Temperature::from_fahrenheit(value)
    } else {
        Temperature::from_celsius(value)
    })
}

/// Raw frame bytes given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexFrame(pub Vec<u8>);

fn parse_frame(s: &str) -> Result<HexFrame, String> {
    let digits: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(digits)
        .map(HexFrame)
        .map_err(|e| format!("Invalid hex frame: {e}"))
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliConnection {
    /// Connect to the heat pump through a Modbus TCP gateway.
    Tcp {
        /// The IP address and port of the Modbus TCP gateway.
        /// Example: "192.168.1.100:502".
        address: String,

        /// The Modbus unit id of the heat pump.
        #[arg(short, long, default_value_t = proto::FACTORY_DEFAULT_UNIT_ID, value_parser = parse_unit)]
        unit: u8,

        #[command(subcommand)]
        command: CliCommands,
    },
    /// Connect to the heat pump via Modbus RTU (RS485).
    Rtu {
        /// Serial port device name.
        /// Examples: "/dev/ttyUSB0" (Linux), "COM3" (Windows).
        #[arg(short, long, default_value_t = default_device_name(), verbatim_doc_comment)]
        device: String,

        /// Baud rate for serial communication.
        #[arg(long, default_value_t = proto::BAUD_RATE)]
        baud_rate: u32,

        /// The Modbus unit id of the heat pump.
        /// Can be specified in decimal or hexadecimal (e.g., "0x01").
        #[arg(short, long, default_value_t = proto::FACTORY_DEFAULT_UNIT_ID, value_parser = parse_unit, verbatim_doc_comment)]
        unit: u8,

        #[command(subcommand)]
        command: CliCommands,
    },
    /// Connect via Modbus RTU with the settings of a YAML configuration file.
    /// The file's timeout and delay replace the --timeout and --delay options.
    #[clap(verbatim_doc_comment)]
    Config {
        /// Path of the YAML configuration file.
        file: PathBuf,

        #[command(subcommand)]
        command: CliCommands,
    },
    /// Validate a captured Modbus RTU frame offline.
    /// The frame is given as hex, spaces and colons are ignored.
    /// Example: "01 03 00 00 00 0A C5 CD".
    #[clap(verbatim_doc_comment)]
    DecodeFrame {
        #[arg(value_parser = parse_frame)]
        frame: HexFrame,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Run in daemon mode: read and print the state at a fixed interval.
    /// Failed read cycles are logged and retried on the next interval.
    #[clap(verbatim_doc_comment)]
    Daemon {
        /// Interval between read cycles (e.g., "10s", "1m").
        #[arg(value_parser = humantime::parse_duration, short, long, default_value = "10s")]
        poll_interval: Duration,
    },

    /// Read all registers and print a summary with the derived metrics.
    Read,

    /// Read all registers and print every known register with its decoded value.
    ReadRaw {
        /// Print as YAML instead of a table.
        #[arg(long)]
        yaml: bool,
    },

    /// Set the operating mode.
    /// C = cooling, H = heating, W = domestic hot water only,
    /// CW = cooling + hot water, HW = heating + hot water.
    #[clap(verbatim_doc_comment)]
    SetMode {
        #[arg(value_parser = parse_mode)]
        mode: proto::Mode,

        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Set the target water temperature of heating mode.
    /// Accepts degrees Celsius or Fahrenheit, e.g. "40C" or "104F".
    #[clap(verbatim_doc_comment)]
    SetHeatingTemp {
        #[arg(value_parser = parse_temperature, allow_hyphen_values = true)]
        temperature: Temperature,
    },

    /// Set the target water temperature of cooling mode.
    /// Accepts degrees Celsius or Fahrenheit, e.g. "12C" or "54F".
    #[clap(verbatim_doc_comment)]
    SetCoolingTemp {
        #[arg(value_parser = parse_temperature, allow_hyphen_values = true)]
        temperature: Temperature,
    },

    /// Set the domestic hot water target temperature.
    /// Accepts degrees Celsius or Fahrenheit, e.g. "50C" or "122F".
    #[clap(verbatim_doc_comment)]
    SetDhwTemp {
        #[arg(value_parser = parse_temperature, allow_hyphen_values = true)]
        temperature: Temperature,
    },
}

const fn about_text() -> &'static str {
    "Chiltrix CX34 CLI - Monitor and control CX34 heat pumps via Modbus RTU/TCP."
}

#[derive(Parser, Debug)]
#[command(name="chilctl", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is warn.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Specifies the connection method and device-specific commands.
    #[command(subcommand)]
    pub connection: CliConnection,

    /// Modbus I/O timeout for each request.
    /// Examples: "10s", "500ms".
    #[arg(global = true, long, default_value = "10s", value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Duration,

    /// Minimum delay between multiple Modbus commands sent to the same device.
    /// Important for Modbus RTU, especially with USB-to-RS485 converters that need time
    /// to switch between transmitting (TX) and receiving (RX) modes.
    /// Examples: "50ms", "100ms".
    #[arg(global = true, long, default_value = "50ms", value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub delay: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn temperatures_with_units() {
        assert_eq!(parse_temperature("35").unwrap().celsius(), 35.0);
        assert_eq!(parse_temperature("35C").unwrap().celsius(), 35.0);
        assert_eq!(parse_temperature("35.5c").unwrap().celsius(), 35.5);
        assert_eq!(parse_temperature("95F").unwrap().celsius(), 35.0);
        assert_eq!(parse_temperature("-4 f").unwrap().celsius(), -20.0);
        assert!(parse_temperature("warm").is_err());
        assert!(parse_temperature("C").is_err());
        assert!(parse_temperature("NaN").is_err());
    }

    #[test]
    fn mode_codes() {
        assert_eq!(parse_mode("C"), Ok(proto::Mode::Cooling));
        assert_eq!(parse_mode("h"), Ok(proto::Mode::Heating));
        assert_eq!(parse_mode("W"), Ok(proto::Mode::OnlyDhw));
        assert_eq!(parse_mode("CW"), Ok(proto::Mode::CoolDhw));
        assert_eq!(parse_mode("HW"), Ok(proto::Mode::HeatDhw));
        assert!(parse_mode("X").is_err());
    }

    #[test]
    fn unit_ids() {
        assert_eq!(parse_unit("1"), Ok(1));
        assert_eq!(parse_unit("0x10"), Ok(16));
        assert!(parse_unit("0").is_err());
        assert!(parse_unit("248").is_err());
    }

    #[test]
    fn frames() {
        assert_eq!(
            parse_frame("01 03 00 00 00 0A C5 CD"),
            Ok(HexFrame(vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD]))
        );
        assert_eq!(parse_frame("01:83:02:c0:f1").unwrap().0.len(), 5);
        assert!(parse_frame("0").is_err());
    }

    #[test]
    fn command_line() {
        let args = CliArgs::try_parse_from([
            "chilctl",
            "--timeout",
            "2s",
            "rtu",
            "--device",
            "/dev/ttyUSB1",
            "set-heating-temp",
            "104F",
        ])
        .unwrap();
        assert_eq!(args.timeout, Duration::from_secs(2));
        assert_matches!(
            args.connection,
            CliConnection::Rtu {
                unit: 1,
                baud_rate: 9600,
                command: CliCommands::SetHeatingTemp { temperature },
                ..
            } if temperature.celsius() == 40.0
        );

        let args = CliArgs::try_parse_from(["chilctl", "config", "cx34.yml", "set-mode", "HW", "--yes"])
            .unwrap();
        assert_matches!(
            args.connection,
            CliConnection::Config {
                command: CliCommands::SetMode {
                    mode: proto::Mode::HeatDhw,
                    yes: true
                },
                ..
            }
        );
    }
}
