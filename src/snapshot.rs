//! Assembling a point-in-time [`Snapshot`] of the CX34's holding registers.
//!
//! The device limits how many registers a single request may cover, so a
//! snapshot of a larger range is read as a series of consecutive chunks. The
//! chunks are merged into one mapping which is only handed out once every
//! chunk has succeeded.
use crate::{
    error::{Error, Result, TransportError},
    protocol as proto,
    transport::RegisterTransport,
};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Raw register values captured during one read cycle.
///
/// A snapshot is complete over the range it was read for and immutable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Snapshot {
    captured_at: SystemTime,
    registers: BTreeMap<proto::Register, u16>,
}

impl Snapshot {
    /// Reads every holding register of the device.
    pub fn read_all<T: RegisterTransport + ?Sized>(transport: &mut T) -> Result<Self> {
        Self::read_range(transport, proto::FIRST_REGISTER, proto::LAST_REGISTER)
    }

    /// Reads the inclusive register range `first..=last`.
    pub fn read_range<T: RegisterTransport + ?Sized>(
        transport: &mut T,
        first: proto::Register,
        last: proto::Register,
    ) -> Result<Self> {
        Self::read_chunked(transport, first, last, proto::MAX_REGISTERS_PER_READ)
    }

    /// Reads `first..=last` with requests of at most `max_chunk` registers.
    ///
    /// The cursor advances by the number of registers each response actually
    /// carries. The last request is clamped so no register past `last` is ever
    /// requested.
    ///
    /// # Errors
    ///
    /// * `proto::Error::InvalidRange` if the range is empty, leaves the holding
    ///   register range, or `max_chunk` is not in `1..=MAX_REGISTERS_PER_READ`.
    ///   No request is issued in that case.
    /// * `Error::ChunkError` carrying the chunk's start register if a request
    ///   fails, returns more registers than requested, or returns none at all.
    pub fn read_chunked<T: RegisterTransport + ?Sized>(
        transport: &mut T,
        first: proto::Register,
        last: proto::Register,
        max_chunk: u16,
    ) -> Result<Self> {
        if first > last
            || last > proto::LAST_REGISTER
            || !(1..=proto::MAX_REGISTERS_PER_READ).contains(&max_chunk)
        {
            return Err(proto::Error::InvalidRange {
                first: first.address(),
                last: last.address(),
                chunk: max_chunk,
            }
            .into());
        }

        let mut registers = BTreeMap::new();
        let mut cursor = first.address();
        while cursor <= last.address() {
            let start = proto::Register::try_from(cursor)?;
            let count = max_chunk.min(last.address() - cursor + 1);
            debug!("Reading {count} registers starting at {start}");

            let words = transport
                .read_registers(start, count)
                .and_then(|words| check_chunk_len(&words, count).map(|()| words))
                .map_err(|source| {
                    warn!("Reading {count} registers starting at {start} failed: {source}");
                    Error::ChunkError { start, source }
                })?;

            for (offset, word) in words.iter().enumerate() {
                let register = proto::Register::try_from(cursor + offset as u16)?;
                registers.insert(register, *word);
            }
            cursor += words.len() as u16;
        }

        Ok(Self {
            captured_at: SystemTime::now(),
            registers,
        })
    }

    /// The moment the last chunk of this snapshot was received.
    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    /// The raw value of `register`.
    pub fn raw(&self, register: proto::Register) -> std::result::Result<u16, proto::Error> {
        self.registers
            .get(&register)
            .copied()
            .ok_or(proto::Error::RegisterNotCaptured { register })
    }

    /// All captured registers in address order.
    pub fn registers(&self) -> impl Iterator<Item = (proto::Register, u16)> + '_ {
        self.registers.iter().map(|(register, raw)| (*register, *raw))
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_values(values: &[(proto::Register, u16)]) -> Self {
        Self {
            captured_at: SystemTime::now(),
            registers: values.iter().copied().collect(),
        }
    }
}

fn check_chunk_len(words: &[u16], requested: u16) -> std::result::Result<(), TransportError> {
    if words.is_empty() {
        Err(TransportError::MalformedResponse(format!(
            "got no register data, requested {requested}"
        )))
    } else if words.len() > requested as usize {
        Err(TransportError::MalformedResponse(format!(
            "returned register data of length {} exceeds requested length {requested}",
            words.len()
        )))
    } else {
        Ok(())
    }
}
