//! Transmitter keying through serial control lines.

#[cfg(feature = "serial")]
mod serial;

use std::{
    thread,
    time::Duration,
};

#[cfg(feature = "serial")]
pub use self::serial::{
    SerialLines,
    SerialOpener,
    available_ports,
};
use crate::{
    BackendError,
    config::PttConfig,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open ptt port {port}")]
    Open {
        port: String,
        #[source]
        source: BackendError,
    },
    #[error("failed to set control lines of ptt port {port}")]
    Lines {
        port: String,
        #[source]
        source: BackendError,
    },
    #[error("ptt lines are enabled, but no port is open")]
    NotOpen,
}

/// The two control lines of a serial port.
pub trait ControlLines: Send + 'static {
    fn set_rts(&mut self, level: bool) -> Result<(), BackendError>;

    fn set_dtr(&mut self, level: bool) -> Result<(), BackendError>;
}

pub trait LinesOpener: Send + 'static {
    type Lines: ControlLines;

    fn open(&self, port: &str) -> Result<Self::Lines, BackendError>;
}

/// Lines that key the transmitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PttLines {
    pub rts: bool,
    pub dtr: bool,
}

impl PttLines {
    pub const NONE: Self = Self {
        rts: false,
        dtr: false,
    };

    #[inline]
    pub fn any(&self) -> bool {
        self.rts || self.dtr
    }
}

impl From<&PttConfig> for PttLines {
    fn from(config: &PttConfig) -> Self {
        Self {
            rts: config.rts,
            dtr: config.dtr,
        }
    }
}

#[derive(derive_more::Debug)]
struct OpenPort<L> {
    name: String,
    #[debug(skip)]
    lines: L,
}

#[derive(derive_more::Debug)]
pub struct PttController<O: LinesOpener> {
    #[debug(skip)]
    opener: O,
    lines: PttLines,
    settle: Duration,
    port: Option<OpenPort<O::Lines>>,
}

impl<O: LinesOpener> PttController<O> {
    pub fn new(opener: O, lines: PttLines, settle: Duration) -> Self {
        Self {
            opener,
            lines,
            settle,
            port: None,
        }
    }

    pub fn from_config(opener: O, config: &PttConfig) -> Self {
        Self::new(opener, config.into(), config.settle())
    }

    /// Opens `port`, closing any open port first. Both lines are reset to
    /// inactive, one after the other.
    pub fn open(&mut self, port: &str) -> Result<(), Error> {
        self.close();

        let mut lines = self.opener.open(port).map_err(|source| {
            Error::Open {
                port: port.to_owned(),
                source,
            }
        })?;

        let lines_error = |source: BackendError| {
            Error::Lines {
                port: port.to_owned(),
                source,
            }
        };
        lines.set_rts(false).map_err(lines_error)?;
        thread::sleep(self.settle);
        lines.set_dtr(false).map_err(lines_error)?;

        tracing::info!(port, lines = ?self.lines, "Opened ptt port");

        self.port = Some(OpenPort {
            name: port.to_owned(),
            lines,
        });
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(port) = self.port.take() {
            tracing::debug!(port = %port.name, "Closing ptt port");
        }
    }

    /// Keys or unkeys the transmitter. Lines that are not enabled are never
    /// touched.
    pub fn set(&mut self, active: bool) -> Result<(), Error> {
        if !self.lines.any() {
            return Ok(());
        }

        let port = self.port.as_mut().ok_or(Error::NotOpen)?;
        let lines_error = |source: BackendError| {
            Error::Lines {
                port: port.name.clone(),
                source,
            }
        };

        tracing::debug!(port = %port.name, active, "Setting ptt");

        if self.lines.rts {
            port.lines.set_rts(active).map_err(lines_error)?;
        }
        if self.lines.dtr {
            port.lines.set_dtr(active).map_err(lines_error)?;
        }
        Ok(())
    }

    /// Changes which lines key the transmitter. Must not be called while a
    /// transmission is running.
    pub fn set_lines(&mut self, lines: PttLines) {
        self.lines = lines;
    }

    #[inline]
    pub fn lines(&self) -> PttLines {
        self.lines
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port.as_ref().map(|port| port.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        LineEvent,
        MockLines,
    };

    fn controller(lines: PttLines, mock: &MockLines) -> PttController<MockLines> {
        PttController::new(mock.clone(), lines, Duration::from_millis(100))
    }

    #[test]
    fn open_resets_lines_with_settle_delay() {
        let mock = MockLines::new();
        let mut ptt = controller(PttLines::NONE, &mock);
        ptt.open("COM1").unwrap();

        let events = mock.timed_events();
        let line_events: Vec<_> = events.iter().map(|(_, event)| event.clone()).collect();
        assert_eq!(
            line_events,
            vec![
                LineEvent::Open("COM1".to_owned()),
                LineEvent::Rts(false),
                LineEvent::Dtr(false),
            ]
        );
        assert!(events[2].0 - events[1].0 >= Duration::from_millis(100));
        assert_eq!(ptt.port_name(), Some("COM1"));
    }

    #[test]
    fn opening_closes_previous_port() {
        let mock = MockLines::new();
        let mut ptt = PttController::new(mock.clone(), PttLines::NONE, Duration::ZERO);
        ptt.open("COM1").unwrap();
        ptt.open("COM2").unwrap();

        let events = mock.events();
        let close = events
            .iter()
            .position(|event| *event == LineEvent::Close("COM1".to_owned()))
            .unwrap();
        let open = events
            .iter()
            .position(|event| *event == LineEvent::Open("COM2".to_owned()))
            .unwrap();
        assert!(close < open);
        assert_eq!(mock.open_ports(), vec!["COM2".to_owned()]);
    }

    #[test]
    fn no_enabled_lines_leave_open_port_alone() {
        let mock = MockLines::new();
        let mut ptt = PttController::new(mock.clone(), PttLines::NONE, Duration::ZERO);
        ptt.open("COM1").unwrap();
        mock.clear();

        ptt.set(true).unwrap();
        ptt.set(false).unwrap();
        assert!(mock.events().is_empty());
    }

    #[test]
    fn only_enabled_lines_are_keyed() {
        let mock = MockLines::new();
        let mut ptt = PttController::new(
            mock.clone(),
            PttLines {
                rts: false,
                dtr: true,
            },
            Duration::ZERO,
        );
        ptt.open("COM1").unwrap();
        mock.clear();

        ptt.set(true).unwrap();
        ptt.set(false).unwrap();
        assert_eq!(mock.events(), vec![LineEvent::Dtr(true), LineEvent::Dtr(false)]);
    }

    #[test]
    fn enabled_lines_without_port_is_an_error() {
        let mock = MockLines::new();
        let mut ptt = controller(
            PttLines {
                rts: true,
                dtr: false,
            },
            &mock,
        );
        assert!(matches!(ptt.set(true), Err(Error::NotOpen)));
    }

    #[test]
    fn open_failure_surfaces() {
        let mock = MockLines::new().fail_open();
        let mut ptt = controller(PttLines::NONE, &mock);
        assert!(matches!(ptt.open("COM9"), Err(Error::Open { .. })));
        assert!(!ptt.is_open());
    }
}
