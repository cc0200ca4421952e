use anyhow::Context;
use chilctl_lib::protocol as proto;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Serial connection settings read from a YAML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModbusConfig {
    #[serde(default = "crate::commandline::default_device_name")]
    pub device: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_unit")]
    pub unit: u8,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_delay", with = "humantime_serde")]
    pub delay: Duration,
}

fn default_baud_rate() -> u32 {
    proto::BAUD_RATE
}

fn default_unit() -> u8 {
    proto::FACTORY_DEFAULT_UNIT_ID
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_delay() -> Duration {
    Duration::from_millis(50)
}

impl ModbusConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        log::debug!("Loading config file from {path:?}");
        let config_file =
            File::open(path).with_context(|| format!("Cannot open config file {path:?}"))?;
        serde_yaml::from_reader(config_file)
            .with_context(|| format!("Cannot parse config file {path:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: ModbusConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(
            config,
            ModbusConfig {
                device: crate::commandline::default_device_name(),
                baud_rate: 9600,
                unit: 1,
                timeout: Duration::from_secs(10),
                delay: Duration::from_millis(50),
            }
        );
    }

    #[test]
    fn full_file() {
        let config: ModbusConfig = serde_yaml::from_str(
            "device: /dev/ttyAMA0\nbaud_rate: 19200\nunit: 3\ntimeout: 2s\ndelay: 100ms\n",
        )
        .unwrap();
        assert_eq!(config.device, "/dev/ttyAMA0");
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.unit, 3);
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.delay, Duration::from_millis(100));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<ModbusConfig>("baudrate: 9600\n").is_err());
    }
}
