use std::time::Duration;

use serialport::SerialPort;

use crate::{
    BackendError,
    config::PttConfig,
    ptt::{
        ControlLines,
        LinesOpener,
    },
};

#[derive(Clone, Copy, Debug)]
pub struct SerialOpener {
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl Default for SerialOpener {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            timeout: Duration::from_secs(1),
        }
    }
}

impl From<&PttConfig> for SerialOpener {
    fn from(config: &PttConfig) -> Self {
        Self {
            baud_rate: config.baud_rate,
            timeout: config.timeout(),
        }
    }
}

impl LinesOpener for SerialOpener {
    type Lines = SerialLines;

    fn open(&self, port: &str) -> Result<Self::Lines, BackendError> {
        let port = serialport::new(port, self.baud_rate)
            .timeout(self.timeout)
            .open()?;
        Ok(SerialLines { port })
    }
}

#[derive(derive_more::Debug)]
pub struct SerialLines {
    #[debug(skip)]
    port: Box<dyn SerialPort>,
}

impl ControlLines for SerialLines {
    fn set_rts(&mut self, level: bool) -> Result<(), BackendError> {
        Ok(self.port.write_request_to_send(level)?)
    }

    fn set_dtr(&mut self, level: bool) -> Result<(), BackendError> {
        Ok(self.port.write_data_terminal_ready(level)?)
    }
}

pub fn available_ports() -> Result<Vec<String>, BackendError> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|port| port.port_name)
        .collect())
}
