//! The narrow request/response contract the rest of the crate talks to.
use crate::{error::TransportError, protocol as proto};

/// A device whose holding registers can be read and written.
///
/// Implementations issue exactly one request per call and block until the
/// response arrives or the connection's timeout elapses. Callers guarantee
/// `1 <= count <= proto::MAX_REGISTERS_PER_READ` and that the requested range
/// ends at or before [`proto::LAST_REGISTER`].
pub trait RegisterTransport {
    /// Reads `count` consecutive holding registers starting at `start`.
    fn read_registers(
        &mut self,
        start: proto::Register,
        count: u16,
    ) -> Result<Vec<u16>, TransportError>;

    /// Writes a single holding register.
    fn write_register(&mut self, register: proto::Register, value: u16)
        -> Result<(), TransportError>;
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for &mut T {
    fn read_registers(
        &mut self,
        start: proto::Register,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        (**self).read_registers(start, count)
    }

    fn write_register(
        &mut self,
        register: proto::Register,
        value: u16,
    ) -> Result<(), TransportError> {
        (**self).write_register(register, value)
    }
}

/// Splits big-endian register data into words.
///
/// An odd number of bytes cannot be a sequence of registers and is rejected
/// rather than truncated.
pub fn words_from_be_bytes(bytes: &[u8]) -> Result<Vec<u16>, TransportError> {
    if bytes.len() % 2 != 0 {
        return Err(TransportError::MalformedResponse(format!(
            "got register data of length {}, want a multiple of 2",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}
