//! Register map of the Chiltrix CX34 heat pump.
//!
//! The CX34 exposes its state as Modbus holding registers in the range
//! [`FIRST_REGISTER`]..=[`LAST_REGISTER`]. Every register the crate knows how
//! to interpret has an entry in [`CATALOG`], which records its name, its
//! [`Encoding`] and the raw value range documented by the manufacturer.
//!
//! Sources: the Chiltrix "Remote Gateway BACnet Guide" (rev. 2) and pages
//! 47-51 of the CX34 installation manual. Entries marked `provisional` were
//! inferred by observing the device and are not confirmed by documentation.
use std::fmt;
use std::str::FromStr;

/// The fixed serial speed of the CX34 RS-485 port.
pub const BAUD_RATE: u32 = 9600;
pub const FACTORY_DEFAULT_UNIT_ID: u8 = 0x01;

pub const FIRST_REGISTER: Register = Register(1);
pub const LAST_REGISTER: Register = Register(350);

/// Upper bound on the number of registers requested in a single read.
pub const MAX_REGISTERS_PER_READ: u16 = 120;

/// Errors raised while validating or interpreting register data.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A register address outside [`FIRST_REGISTER`]..=[`LAST_REGISTER`].
    #[error("register address {0} is out of range 1..=350")]
    AddressOutOfRange(u16),

    /// A read range that cannot be requested from the device.
    #[error("cannot read register range {first}..={last} in chunks of {chunk}")]
    InvalidRange { first: u16, last: u16, chunk: u16 },

    /// A value that does not fit the documented range of the register it is written to.
    #[error("value {value} for register {register} is out of range {min}..={max}")]
    OutOfRange {
        register: Register,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A raw register value that is not part of the register's enumeration.
    #[error("register {register} holds unknown value {raw}")]
    UnknownEnumValue { register: Register, raw: u16 },

    /// The register was not part of the captured snapshot.
    #[error("register {register} was not captured in this snapshot")]
    RegisterNotCaptured { register: Register },

    /// The register has no decoding rule.
    #[error("register {register} is not in the register catalog")]
    NotInCatalog { register: Register },
}

/// A holding register address of the CX34.
///
/// Addresses are 1-indexed and sent unchanged on the wire; address 0 is never valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(transparent))]
pub struct Register(u16);

impl Register {
    /// The address of this register.
    pub const fn address(&self) -> u16 {
        self.0
    }

    /// Returns the catalog entry describing this register, if there is one.
    pub fn entry(&self) -> Option<&'static CatalogEntry> {
        lookup(*self)
    }
}

impl TryFrom<u16> for Register {
    type Error = Error;

    fn try_from(address: u16) -> Result<Self, Self::Error> {
        if (FIRST_REGISTER.0..=LAST_REGISTER.0).contains(&address) {
            Ok(Self(address))
        } else {
            Err(Error::AddressOutOfRange(address))
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry() {
            Some(entry) => write!(f, "{}({})", entry.name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// How the raw 16-bit value of a register maps to a physical quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Signed whole degrees Celsius.
    Celsius,
    /// Signed tenths of a degree Celsius.
    DeciCelsius,
    /// Tenths of a liter per minute.
    DeciLitersPerMinute,
    /// Tenths of an ampere.
    DeciAmpere,
    /// Whole volts.
    Volt,
    /// Whole hertz.
    Hertz,
    /// `0` = off, `1` = on.
    Switch,
    /// Operating mode, see [`Mode`].
    Mode,
    /// A plain counter or setting without a physical unit.
    Count,
    /// A status or fault code, best read in hexadecimal.
    Code,
}

impl Encoding {
    /// Divisor applied to the raw value before it is interpreted in [`Encoding::unit`].
    pub const fn scale(&self) -> u16 {
        match self {
            Encoding::DeciCelsius | Encoding::DeciLitersPerMinute | Encoding::DeciAmpere => 10,
            _ => 1,
        }
    }

    pub const fn unit(&self) -> &'static str {
        match self {
            Encoding::Celsius | Encoding::DeciCelsius => "°C",
            Encoding::DeciLitersPerMinute => "l/min",
            Encoding::DeciAmpere => "A",
            Encoding::Volt => "V",
            Encoding::Hertz => "Hz",
            Encoding::Switch | Encoding::Mode | Encoding::Count | Encoding::Code => "",
        }
    }

    /// Whether the raw value is a two's complement 16-bit integer.
    pub const fn is_signed(&self) -> bool {
        matches!(self, Encoding::Celsius | Encoding::DeciCelsius)
    }
}

/// Describes one known register.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    pub register: Register,
    pub name: &'static str,
    pub encoding: Encoding,
    /// Lowest documented raw value (after sign interpretation).
    pub min: i32,
    /// Highest documented raw value (after sign interpretation).
    pub max: i32,
    /// The mapping was inferred from observation rather than documentation.
    pub provisional: bool,
}

impl CatalogEntry {
    /// Interprets a raw register word according to the entry's signedness.
    pub const fn raw_value(&self, raw: u16) -> i32 {
        if self.encoding.is_signed() {
            raw as i16 as i32
        } else {
            raw as i32
        }
    }

    /// The raw value divided by the encoding's [`Encoding::scale`], in [`Encoding::unit`].
    pub fn scaled(&self, raw: u16) -> f64 {
        f64::from(self.raw_value(raw)) / f64::from(self.encoding.scale())
    }

    pub fn contains_raw(&self, raw: u16) -> bool {
        (self.min..=self.max).contains(&self.raw_value(raw))
    }
}

macro_rules! provisional {
    () => {
        false
    };
    (inferred) => {
        true
    };
}

macro_rules! catalog {
    ($($const_name: ident = $address: literal: $encoding: ident, $name: literal, $min: literal, $max: literal $(, $flag: ident)?;)+) => {
        impl Register {
            $(pub const $const_name: Register = Register($address);)+
        }

        const CATALOG_ENTRIES: &[CatalogEntry] = &[
            $(CatalogEntry {
                register: Register($address),
                name: $name,
                encoding: Encoding::$encoding,
                min: $min,
                max: $max,
                provisional: provisional!($($flag)?),
            },)+
        ];
    };
}

catalog! {
    EC_WATER_PUMP_MINIMUM_SPEED = 53: Count, "ECWaterPumpMinimumSpeed", 40, 80;
    ON_OFF_MODE = 140: Switch, "OnOffMode", 0, 1;
    AC_MODE = 141: Mode, "ACMode", 0, 4;
    TARGET_COOLING_TEMP = 142: Celsius, "TargetACCoolingModeTemp", 5, 70;
    TARGET_HEATING_TEMP = 143: Celsius, "TargetACHeatingModeTemp", 5, 70;
    TARGET_DHW_TEMP = 144: Celsius, "TargetDomesticHotWaterTemp", 5, 70, inferred;
    OUT_PIPE_TEMP = 200: DeciCelsius, "OutPipeTemp", -300, 970;
    COMPRESSOR_DISCHARGE_TEMP = 201: DeciCelsius, "CompressorDischargeTemp", -300, 1500;
    AMBIENT_TEMP = 202: DeciCelsius, "AmbientTemp", -300, 970;
    SUCTION_TEMP = 203: DeciCelsius, "SuctionTemp", -300, 970;
    PLATE_HEAT_EXCHANGER_TEMP = 204: DeciCelsius, "PlateHeatExchangerTemp", -300, 970;
    AC_OUTLET_WATER_TEMP = 205: DeciCelsius, "ACOutletWaterTemp", -300, 970;
    SOLAR_TEMP = 206: DeciCelsius, "SolarTemp", -300, 1500;
    COMPRESSOR_CURRENT_P15 = 209: DeciAmpere, "CompressorCurrentValueP15", 0, 300;
    WATER_FLOW_RATE = 213: DeciLitersPerMinute, "WaterFlowRate", 0, 65535;
    P03_STATUS = 214: Switch, "P03Status", 0, 1;
    P04_STATUS = 215: Switch, "P04Status", 0, 1;
    P05_STATUS = 216: Switch, "P05Status", 0, 1;
    P06_STATUS = 217: Switch, "P06Status", 0, 1;
    P07_STATUS = 218: Switch, "P07Status", 0, 1;
    P08_STATUS = 219: Switch, "P08Status", 0, 1;
    P09_STATUS = 220: Switch, "P09Status", 0, 1;
    P10_STATUS = 221: Switch, "P10Status", 0, 1;
    HIGH_PRESSURE_SWITCH = 222: Switch, "HighPressureSwitchStatus", 0, 1;
    LOW_PRESSURE_SWITCH = 223: Switch, "LowPressureSwitchStatus", 0, 1;
    SECOND_HIGH_PRESSURE_SWITCH = 224: Switch, "SecondHighPressureSwitchStatus", 0, 1;
    INNER_WATER_FLOW_SWITCH = 225: Switch, "InnerWaterFlowSwitch", 0, 1;
    COMPRESSOR_FREQUENCY = 227: Hertz, "CompressorFrequency", 0, 120;
    THERMAL_SWITCH = 228: Switch, "ThermalSwitchStatus", 0, 1;
    OUTDOOR_FAN_MOTOR = 229: Switch, "OutdoorFanMotor", 0, 1;
    ELECTRICAL_VALVE_1 = 230: Switch, "ElectricalValve1", 0, 1;
    ELECTRICAL_VALVE_2 = 231: Switch, "ElectricalValve2", 0, 1;
    ELECTRICAL_VALVE_3 = 232: Switch, "ElectricalValve3", 0, 1;
    ELECTRICAL_VALVE_4 = 233: Switch, "ElectricalValve4", 0, 1;
    C4_WATER_PUMP = 234: Switch, "C4WaterPump", 0, 1;
    C5_WATER_PUMP = 235: Switch, "C5WaterPump", 0, 1;
    C6_WATER_PUMP = 236: Switch, "C6WaterPump", 0, 1;
    DAYS_SINCE_VIRUS_KILLING = 237: Count, "AccumulativeDaysAfterLastVirusKilling", 0, 99;
    OUTDOOR_MODULAR_TEMP = 238: Celsius, "OutdoorModularTemp", -30, 97;
    EXPANSION_VALVE_1_OPENING = 239: Count, "ExpansionValve1OpeningDegree", 0, 500;
    EXPANSION_VALVE_2_OPENING = 240: Count, "ExpansionValve2OpeningDegree", 0, 500;
    INNER_PIPE_TEMP = 241: Celsius, "InnerPipeTemp", -30, 97;
    HEATING_METHOD_2_TARGET_TEMP = 242: Celsius, "HeatingMethod2TargetTemperature", -30, 97;
    INDOOR_TEMPERATURE_CONTROL_SWITCH = 243: Switch, "IndoorTemperatureControlSwitch", 0, 1;
    FAN_TYPE = 244: Count, "FanType", 0, 2;
    EC_FAN_MOTOR_1_SPEED = 245: Count, "ECFanMotor1Speed", 0, 3000;
    EC_FAN_MOTOR_2_SPEED = 246: Count, "ECFanMotor2Speed", 0, 3000;
    WATER_PUMP_TYPE = 247: Count, "WaterPumpTypes", 0, 1;
    INTERNAL_PUMP_SPEED = 248: Count, "InternalPumpSpeed", 1, 10;
    BOOSTER_PUMP_SPEED = 249: Count, "BoosterPumpSpeed", 1, 10;
    INDUCTOR_AC_CURRENT = 250: DeciAmpere, "InductorACCurrent", 0, 500;
    DRIVER_WORKING_STATUS = 251: Code, "DriverWorkingStatusValue", 0, 65535;
    COMPRESSOR_SHUTDOWN_CODE = 252: Code, "CompressorShutDownCode", 0, 65535;
    DRIVER_ALLOWED_HIGHEST_FREQUENCY = 253: Hertz, "DriverAllowedHighestFrequency", 30, 120;
    REDUCE_FREQUENCY_TEMP = 254: Celsius, "ReduceFrequencyTemperature", 55, 200;
    INPUT_AC_VOLTAGE = 255: Volt, "InputACVoltage", 0, 550;
    INPUT_AC_CURRENT = 256: DeciAmpere, "InputACCurrent", 0, 500;
    COMPRESSOR_PHASE_CURRENT = 257: DeciAmpere, "CompressorPhaseCurrent", 0, 500;
    BUS_LINE_VOLTAGE = 258: Volt, "BusLineVoltage", 0, 750;
    FAN_SHUTDOWN_CODE = 259: Code, "FanShutdownCode", 0, 65535;
    IPM_TEMP = 260: Celsius, "IPMTemp", 55, 200;
    COMPRESSOR_TOTAL_RUNNING_TIME = 261: Count, "CompressorTotalRunningTime", 0, 65000;
    DHW_TANK_TEMP = 280: DeciCelsius, "DomesticHotWaterTankTemp", -300, 970, inferred;
    WATER_INLET_TEMP_1 = 281: DeciCelsius, "WaterInletSensorTemp1", -300, 970, inferred;
    WATER_INLET_TEMP_2 = 282: DeciCelsius, "WaterInletSensorTemp2", -300, 970, inferred;
    CURRENT_FAULT_CODE = 284: Code, "CurrentFaultCode", 0, 65535, inferred;
}

// Lookups rely on the table being sorted by address without duplicates.
const _: () = {
    let mut index = 0;
    while index < CATALOG_ENTRIES.len() {
        let address = CATALOG_ENTRIES[index].register.0;
        assert!(
            address >= FIRST_REGISTER.0 && address <= LAST_REGISTER.0,
            "CATALOG contains an address outside the holding register range"
        );
        if index > 0 {
            assert!(
                CATALOG_ENTRIES[index - 1].register.0 < address,
                "CATALOG is not sorted (or has duplicate addresses)"
            );
        }
        index += 1;
    }
};

/// All registers with a known meaning, sorted by address.
pub static CATALOG: &[CatalogEntry] = CATALOG_ENTRIES;

/// Finds the catalog entry for `register`.
pub fn lookup(register: Register) -> Option<&'static CatalogEntry> {
    CATALOG
        .binary_search_by_key(&register, |entry| entry.register)
        .ok()
        .map(|index| &CATALOG[index])
}

/// Operating mode of the heat pump, stored in [`Register::AC_MODE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Mode {
    Cooling,
    Heating,
    OnlyDhw,
    CoolDhw,
    HeatDhw,
    /// A raw value the device reported that is not a known mode.
    Unknown(u16),
}

impl Mode {
    /// The modes that can be written to the device.
    pub const SETTABLE: [Mode; 5] = [
        Mode::Cooling,
        Mode::Heating,
        Mode::OnlyDhw,
        Mode::CoolDhw,
        Mode::HeatDhw,
    ];

    /// Decodes a raw register value, mapping unknown codes to [`Mode::Unknown`].
    pub fn decode(raw: u16) -> Self {
        Self::try_from(raw).unwrap_or(Mode::Unknown(raw))
    }

    /// Encodes the mode for writing; [`Mode::Unknown`] cannot be written.
    pub fn encode(&self) -> Result<u16, Error> {
        match self {
            Mode::Cooling => Ok(0),
            Mode::Heating => Ok(1),
            Mode::OnlyDhw => Ok(2),
            Mode::CoolDhw => Ok(3),
            Mode::HeatDhw => Ok(4),
            Mode::Unknown(raw) => Err(Error::OutOfRange {
                register: Register::AC_MODE,
                value: f64::from(*raw),
                min: 0.0,
                max: 4.0,
            }),
        }
    }

    /// Only plain cooling counts as cooling, cooling with DHW does not.
    pub fn is_cooling(&self) -> bool {
        *self == Mode::Cooling
    }

    pub fn is_heating(&self) -> bool {
        *self == Mode::Heating
    }
}

impl TryFrom<u16> for Mode {
    type Error = Error;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Mode::Cooling),
            1 => Ok(Mode::Heating),
            2 => Ok(Mode::OnlyDhw),
            3 => Ok(Mode::CoolDhw),
            4 => Ok(Mode::HeatDhw),
            _ => Err(Error::UnknownEnumValue {
                register: Register::AC_MODE,
                raw,
            }),
        }
    }
}

/// Error returned when parsing a [`Mode`] from a string fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid mode '{0}', expected one of C, H, W, CW, HW")]
pub struct ParseModeError(String);

impl FromStr for Mode {
    type Err = ParseModeError;

    /// Parses the short mode codes used on the controller: `C`, `H`, `W`, `CW` and `HW`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "C" => Ok(Mode::Cooling),
            "H" => Ok(Mode::Heating),
            "W" => Ok(Mode::OnlyDhw),
            "CW" => Ok(Mode::CoolDhw),
            "HW" => Ok(Mode::HeatDhw),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Cooling => write!(f, "Cooling"),
            Mode::Heating => write!(f, "Heating"),
            Mode::OnlyDhw => write!(f, "DHW"),
            Mode::CoolDhw => write!(f, "Cooling + DHW"),
            Mode::HeatDhw => write!(f, "Heating + DHW"),
            Mode::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}
