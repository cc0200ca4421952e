//! Error types shared by the snapshot, command and transport layers.
use crate::protocol as proto;

/// A failure reported by a [`RegisterTransport`](crate::transport::RegisterTransport).
///
/// None of these are retried by the crate; retry policy belongs to the caller.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// No response arrived within the timeout configured at connection setup.
    #[error("request timed out")]
    Timeout,

    /// The underlying connection failed.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// The device answered with a Modbus exception response carrying this code.
    #[error("device exception code {0:#04x}")]
    Exception(u8),

    /// The response does not have the shape the request asked for.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            TransportError::Timeout
        } else {
            TransportError::Io(err)
        }
    }
}

/// Represents all possible errors of a read cycle or write command.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wraps `proto::Error`.
    #[error(transparent)]
    ProtocolError(#[from] proto::Error),

    /// Wraps `TransportError` of a single request.
    #[error(transparent)]
    TransportError(#[from] TransportError),

    /// A chunk of a multi-register read failed; no snapshot was produced.
    #[error("reading registers starting at {start} failed: {source}")]
    ChunkError {
        start: proto::Register,
        #[source]
        source: TransportError,
    },
}

/// The result type of this crate's device operations.
pub type Result<T> = std::result::Result<T, Error>;
