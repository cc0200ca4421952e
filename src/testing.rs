//! Test doubles: an in-memory CX34 and a `log` backend that records events per thread.
use crate::{error::TransportError, protocol as proto, transport::RegisterTransport};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Once;

/// An in-memory register bank recording every request it receives.
#[derive(Debug, Default)]
pub(crate) struct MockDevice {
    pub registers: BTreeMap<u16, u16>,
    pub reads: Vec<(u16, u16)>,
    pub writes: Vec<(u16, u16)>,
    /// Reads starting at this address time out.
    pub fail_at: Option<u16>,
    /// Caps the number of words returned per read.
    pub max_words: Option<u16>,
    /// Returns one word more than requested.
    pub overlong: bool,
}

impl MockDevice {
    pub fn with_registers(values: &[(proto::Register, u16)]) -> Self {
        Self {
            registers: values
                .iter()
                .map(|(register, value)| (register.address(), *value))
                .collect(),
            ..Default::default()
        }
    }
}

impl RegisterTransport for MockDevice {
    fn read_registers(
        &mut self,
        start: proto::Register,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        self.reads.push((start.address(), count));
        if self.fail_at == Some(start.address()) {
            return Err(TransportError::Timeout);
        }
        let mut count = self.max_words.map_or(count, |max| count.min(max));
        if self.overlong {
            count += 1;
        }
        Ok((start.address()..start.address() + count)
            .map(|address| self.registers.get(&address).copied().unwrap_or(0))
            .collect())
    }

    fn write_register(
        &mut self,
        register: proto::Register,
        value: u16,
    ) -> Result<(), TransportError> {
        self.writes.push((register.address(), value));
        self.registers.insert(register.address(), value);
        Ok(())
    }
}

thread_local! {
    static EVENTS: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        EVENTS.with(|events| {
            events
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Installs the capturing logger and forgets events previously logged on this thread.
pub(crate) fn capture_logs() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
    });
    EVENTS.with(|events| events.borrow_mut().clear());
}

/// Messages logged on this thread at `level` since [`capture_logs`].
pub(crate) fn captured(level: log::Level) -> Vec<String> {
    EVENTS.with(|events| {
        events
            .borrow()
            .iter()
            .filter(|(event_level, _)| *event_level == level)
            .map(|(_, message)| message.clone())
            .collect()
    })
}
