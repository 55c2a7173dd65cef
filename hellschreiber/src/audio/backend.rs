use std::fmt::{
    self,
    Display,
};

use crate::{
    BackendError,
    audio::{
        SampleFormat,
        Samples,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutputDevice {
    pub id: String,
    pub name: String,
    /// Host API or driver category, e.g. `ALSA` or `ASIO`.
    pub host: String,
}

impl Display for OutputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.host)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: SampleFormat,
}

pub trait OutputBackend: Send + Sync + 'static {
    type Stream: OutputStream;

    fn output_devices(&self) -> Result<Vec<OutputDevice>, BackendError>;

    fn default_output_device(&self) -> Result<Option<OutputDevice>, BackendError>;

    fn open_stream(
        &self,
        device: &OutputDevice,
        config: &StreamConfig,
    ) -> Result<Self::Stream, BackendError>;
}

pub trait OutputStream: Send + 'static {
    /// Queues samples. May block while the device is behind.
    fn write(&mut self, samples: Samples<'_>) -> Result<(), BackendError>;

    /// Plays samples and blocks until they have been played.
    fn play(&mut self, samples: Samples<'_>) -> Result<(), BackendError>;

    /// Blocks until all queued samples have been played.
    fn drain(&mut self) -> Result<(), BackendError>;
}
