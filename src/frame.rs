//! Offline validation of raw Modbus RTU frames.
//!
//! This is a diagnostic aid for captured traffic: the transport does its own
//! framing, so a frame rejected here never aborts a read cycle.
//! [`FrameLogger`] only annotates frames handed to it, such as those of the
//! `decode-frame` command; it does not tap a live Modbus connection.
use crate::transport::words_from_be_bytes;
use log::{debug, warn};
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

const MODBUS_CRC: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_MODBUS);

/// Unit id, function code and CRC trailer.
pub const MIN_FRAME_LEN: usize = 4;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("frame of {len} bytes is too short, need at least 4")]
    FrameTooShort { len: usize },

    #[error("checksum mismatch: computed {computed:#06x}, received {received:#06x}")]
    ChecksumMismatch { computed: u16, received: u16 },

    #[error("malformed payload: {0}")]
    MalformedResponse(String),
}

/// CRC-16/MODBUS of `bytes`.
pub fn checksum(bytes: &[u8]) -> u16 {
    MODBUS_CRC.checksum(bytes)
}

/// A frame whose checksum matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub unit_id: u8,
    pub function_code: u8,
    pub payload: Vec<u8>,
}

/// Checks length and trailing CRC of an RTU frame and splits it up.
///
/// The CRC trailer is little-endian, unlike the register data.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, Error> {
    if bytes.len() < MIN_FRAME_LEN {
        return Err(Error::FrameTooShort { len: bytes.len() });
    }
    let (body, trailer) = bytes.split_at(bytes.len() - 2);
    let received = u16::from_le_bytes([trailer[0], trailer[1]]);
    let computed = checksum(body);
    if computed != received {
        return Err(Error::ChecksumMismatch { computed, received });
    }
    Ok(Frame {
        unit_id: body[0],
        function_code: body[1],
        payload: body[2..].to_vec(),
    })
}

impl Frame {
    pub fn is_exception(&self) -> bool {
        self.function_code & 0x80 != 0
    }

    /// The exception code of an exception response.
    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() {
            self.payload.first().copied()
        } else {
            None
        }
    }

    /// Register words of a read holding registers response.
    pub fn register_values(&self) -> Result<Vec<u16>, Error> {
        let (byte_count, data) = self
            .payload
            .split_first()
            .ok_or_else(|| Error::MalformedResponse("missing byte count".to_string()))?;
        if usize::from(*byte_count) != data.len() {
            return Err(Error::MalformedResponse(format!(
                "byte count {byte_count} does not match {} data bytes",
                data.len()
            )));
        }
        words_from_be_bytes(data).map_err(|err| Error::MalformedResponse(err.to_string()))
    }

    fn annotation(&self) -> String {
        match self.exception_code() {
            Some(code) => format!(
                "exception {code:#04x} for function {:#04x}",
                self.function_code & 0x7F
            ),
            None => format!(
                "unit {} function {:#04x} with {} payload bytes",
                self.unit_id,
                self.function_code,
                self.payload.len()
            ),
        }
    }
}

/// Records every chunk written through it as an annotated hex line.
///
/// Each line reads `<unix-nanos> <hex> // <n> bytes; <annotation>`. The
/// annotation is the decoded frame or the reason it failed to decode.
#[derive(Debug)]
pub struct FrameLogger<W: Write> {
    inner: W,
}

impl<W: Write> FrameLogger<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for FrameLogger<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let annotation = match decode_frame(buf) {
            Ok(frame) => {
                let annotation = frame.annotation();
                debug!("Frame {}: {annotation}", hex::encode(buf));
                annotation
            }
            Err(err @ Error::ChecksumMismatch { .. }) => {
                warn!("Frame {}: {err}", hex::encode(buf));
                err.to_string()
            }
            Err(err) => {
                debug!("Frame {}: {err}", hex::encode(buf));
                err.to_string()
            }
        };
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        writeln!(
            self.inner,
            "{nanos} {} // {} bytes; {annotation}",
            hex::encode(buf),
            buf.len()
        )?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{capture_logs, captured};
    use assert_matches::assert_matches;

    fn bytes(hex: &str) -> Vec<u8> {
        hex::decode(hex).unwrap()
    }

    #[test]
    fn known_good_request() {
        let frame = decode_frame(&bytes("01030000000ac5cd")).unwrap();
        assert_eq!(frame.unit_id, 1);
        assert_eq!(frame.function_code, 0x03);
        assert_eq!(frame.payload, vec![0x00, 0x00, 0x00, 0x0A]);
        assert!(!frame.is_exception());
    }

    #[test]
    fn checksum_values() {
        assert_eq!(checksum(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), 0x0A84);
        assert_eq!(checksum(&[0x01, 0x10, 0x00, 0x8F]), 0xB941);
    }

    #[test]
    fn corrupted_trailer() {
        assert_eq!(
            decode_frame(&[0x01, 0x10, 0x00, 0x8F, 0x41, 0xBA]),
            Err(Error::ChecksumMismatch {
                computed: 0xB941,
                received: 0xBA41
            })
        );
    }

    #[test]
    fn too_short() {
        assert_eq!(
            decode_frame(&[0x01, 0x03, 0x00]),
            Err(Error::FrameTooShort { len: 3 })
        );
        assert_eq!(decode_frame(&[]), Err(Error::FrameTooShort { len: 0 }));
    }

    #[test]
    fn minimal_frame_has_empty_payload() {
        let crc = checksum(&[0x01, 0x03]).to_le_bytes();
        let frame = decode_frame(&[0x01, 0x03, crc[0], crc[1]]).unwrap();
        assert!(frame.payload.is_empty());
        assert_matches!(frame.register_values(), Err(Error::MalformedResponse(..)));
    }

    #[test]
    fn read_response_values() {
        let frame = decode_frame(&bytes("010304002301c5ca3a")).unwrap();
        assert_eq!(frame.register_values(), Ok(vec![0x0023, 0x01C5]));
    }

    #[test]
    fn odd_register_data() {
        let frame = decode_frame(&bytes("0103030023019d7e")).unwrap();
        assert_matches!(frame.register_values(), Err(Error::MalformedResponse(..)));
    }

    #[test]
    fn byte_count_mismatch() {
        let frame = decode_frame(&bytes("0103040023019c0a")).unwrap();
        assert_matches!(frame.register_values(), Err(Error::MalformedResponse(..)));
    }

    #[test]
    fn exception_response() {
        let frame = decode_frame(&bytes("018302c0f1")).unwrap();
        assert!(frame.is_exception());
        assert_eq!(frame.exception_code(), Some(0x02));
        assert_eq!(frame.annotation(), "exception 0x02 for function 0x03");
    }

    #[test]
    fn logger_annotates_frames() {
        capture_logs();
        let mut logger = FrameLogger::new(Vec::new());
        logger.write_all(&bytes("01030000000ac5cd")).unwrap();
        logger.write_all(&[0x01, 0x10, 0x00, 0x8F, 0x41, 0xBA]).unwrap();
        let output = String::from_utf8(logger.into_inner()).unwrap();

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0]
            .ends_with(" 01030000000ac5cd // 8 bytes; unit 1 function 0x03 with 4 payload bytes"));
        assert!(lines[1].contains(" 0110008f41ba // 6 bytes; checksum mismatch"));
        assert!(lines[0]
            .split(' ')
            .next()
            .unwrap()
            .parse::<u128>()
            .is_ok());
        assert_eq!(captured(log::Level::Warn).len(), 1);
    }
}
