//! Serial settings and error mapping shared by the `tokio-modbus` based transport.
use crate::error::TransportError;

/// The parity used for serial communication.
pub const PARITY: &tokio_serial::Parity = &tokio_serial::Parity::None;
/// The number of stop bits used for serial communication.
pub const STOP_BITS: &tokio_serial::StopBits = &tokio_serial::StopBits::One;
/// The number of data bits used for serial communication.
pub const DATA_BITS: &tokio_serial::DataBits = &tokio_serial::DataBits::Eight;

/// Creates a `tokio_serial::SerialPortBuilder` with the CX34's line settings.
///
/// # Arguments
///
/// * `device` - The path to the serial port device (e.g., `/dev/ttyUSB0`).
/// * `baud_rate` - The baud rate, normally [`crate::protocol::BAUD_RATE`].
pub fn serial_port_builder(device: &str, baud_rate: u32) -> tokio_serial::SerialPortBuilder {
    tokio_serial::new(device, baud_rate)
        .parity(*PARITY)
        .stop_bits(*STOP_BITS)
        .data_bits(*DATA_BITS)
        .flow_control(tokio_serial::FlowControl::None)
}

impl From<tokio_modbus::Error> for TransportError {
    fn from(err: tokio_modbus::Error) -> Self {
        match err {
            tokio_modbus::Error::Transport(err) => err.into(),
            // Header, function code or length mismatches between request and response.
            other => TransportError::MalformedResponse(other.to_string()),
        }
    }
}

impl From<tokio_modbus::ExceptionCode> for TransportError {
    fn from(code: tokio_modbus::ExceptionCode) -> Self {
        TransportError::Exception(code.into())
    }
}

/// Helper function to map a tokio-modbus result to our result.
pub(crate) fn map_tokio_result<T>(result: tokio_modbus::Result<T>) -> Result<T, TransportError> {
    match result {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(err.into()), // Modbus exception
        Err(err) => Err(err.into()),     // IO error
    }
}
