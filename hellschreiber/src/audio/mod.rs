//! Audio output.
//!
//! [`AudioSink`] owns the output stream of one device. It negotiates the
//! sample format, applies the volume, and writes either in chunks or in one
//! blocking call, depending on the device's host.

mod backend;
mod format;
#[cfg(feature = "audio")]
mod rodio;
mod wav;

use parking_lot::Mutex;

#[cfg(feature = "audio")]
pub use self::rodio::{
    RodioBackend,
    RodioStream,
};
pub use self::{
    backend::{
        OutputBackend,
        OutputDevice,
        OutputStream,
        StreamConfig,
    },
    format::{
        SampleBuffer,
        SampleFormat,
        Samples,
        f32_to_i16,
        i16_to_f32,
    },
    wav::{
        WavBackend,
        WavStream,
    },
};
use crate::{
    BackendError,
    config::SoundConfig,
    util::db_to_linear,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no output device available")]
    NoDevice,
    #[error("output device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to enumerate output devices")]
    Enumeration(#[source] BackendError),
    #[error("output device {device} rejected all sample formats")]
    Negotiation {
        device: String,
        #[source]
        source: BackendError,
    },
    #[error("write to output device {device} failed")]
    Write {
        device: String,
        #[source]
        source: BackendError,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Stream the samples in chunks of `chunk_size`.
    Chunked { chunk_size: usize },
    /// Hand over the whole job in one blocking call.
    WholeBuffer,
}

/// Picks the write mode from a device's host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteModePolicy {
    /// Hosts that mishandle small incremental writes. Matched ignoring case.
    pub whole_buffer_hosts: Vec<String>,
    pub chunk_size: usize,
}

impl WriteModePolicy {
    pub fn from_config(config: &SoundConfig, samples_per_pixel: usize) -> Self {
        Self {
            whole_buffer_hosts: config.whole_buffer_hosts.clone(),
            chunk_size: (config.chunk_pixels * samples_per_pixel).max(1),
        }
    }

    pub fn write_mode(&self, device: &OutputDevice) -> WriteMode {
        if self
            .whole_buffer_hosts
            .iter()
            .any(|host| host.eq_ignore_ascii_case(&device.host))
        {
            WriteMode::WholeBuffer
        }
        else {
            WriteMode::Chunked {
                chunk_size: self.chunk_size,
            }
        }
    }
}

/// Finds the device called `name`, or the default device if no name is
/// given. Without a default device the first device is used.
pub fn resolve_device<B: OutputBackend>(
    backend: &B,
    name: Option<&str>,
) -> Result<OutputDevice, Error> {
    if let Some(name) = name {
        return backend
            .output_devices()
            .map_err(Error::Enumeration)?
            .into_iter()
            .find(|device| device.name == name)
            .ok_or_else(|| Error::DeviceNotFound(name.to_owned()));
    }

    if let Some(device) = backend
        .default_output_device()
        .map_err(Error::Enumeration)?
    {
        return Ok(device);
    }

    backend
        .output_devices()
        .map_err(Error::Enumeration)?
        .into_iter()
        .next()
        .ok_or(Error::NoDevice)
}

#[derive(derive_more::Debug)]
struct SinkState<S> {
    device: Option<OutputDevice>,
    #[debug(skip)]
    stream: Option<S>,
    format: Option<SampleFormat>,
    available: bool,
}

impl<S> Default for SinkState<S> {
    fn default() -> Self {
        Self {
            device: None,
            stream: None,
            format: None,
            available: false,
        }
    }
}

impl<S> SinkState<S> {
    fn mark_unavailable(&mut self) {
        self.stream = None;
        self.available = false;
    }

    fn device_name(&self) -> String {
        self.device
            .as_ref()
            .map(|device| device.name.clone())
            .unwrap_or_default()
    }
}

/// Output stream of one device.
///
/// Opening, closing and writing are serialized by one lock.
#[derive(derive_more::Debug)]
pub struct AudioSink<B: OutputBackend> {
    #[debug(skip)]
    backend: B,
    policy: WriteModePolicy,
    sample_rate: u32,
    state: Mutex<SinkState<B::Stream>>,
}

impl<B: OutputBackend> AudioSink<B> {
    pub fn new(backend: B, policy: WriteModePolicy, sample_rate: u32) -> Self {
        Self {
            backend,
            policy,
            sample_rate,
            state: Mutex::new(SinkState::default()),
        }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn policy(&self) -> &WriteModePolicy {
        &self.policy
    }

    /// Opens `device`, closing the current stream first.
    pub fn open(&self, device: OutputDevice) -> Result<SampleFormat, Error> {
        let mut state = self.state.lock();
        state.mark_unavailable();
        state.device = Some(device);
        self.reopen(&mut state)
    }

    /// Resolves a device by name and opens it.
    pub fn select_device(&self, name: Option<&str>) -> Result<SampleFormat, Error> {
        let device = resolve_device(&self.backend, name)?;
        self.open(device)
    }

    /// Opens the selected device, or the default one, unless a stream is
    /// already open.
    pub fn ensure_open(&self) -> Result<SampleFormat, Error> {
        let mut state = self.state.lock();
        self.ensure_open_locked(&mut state)
    }

    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.stream.is_some() {
            tracing::debug!(device = %state.device_name(), "Closing output stream");
        }
        state.mark_unavailable();
        state.format = None;
    }

    pub fn negotiated_format(&self) -> Option<SampleFormat> {
        self.state.lock().format
    }

    pub fn is_available(&self) -> bool {
        self.state.lock().available
    }

    pub fn device(&self) -> Option<OutputDevice> {
        self.state.lock().device.clone()
    }

    pub fn write_mode(&self) -> Option<WriteMode> {
        self.state
            .lock()
            .device
            .as_ref()
            .map(|device| self.policy.write_mode(device))
    }

    /// Writes `samples` scaled by `volume_db` and waits until they have been
    /// played.
    pub fn write(&self, samples: &[f32], volume_db: f32) -> Result<(), Error> {
        self.write_buffers(&[samples], volume_db)
    }

    /// Writes consecutive buffers as one stream and waits until they have
    /// been played.
    ///
    /// A failed write reopens the stream and retries once before the error
    /// is returned.
    pub fn write_buffers<T: AsRef<[f32]>>(&self, buffers: &[T], volume_db: f32) -> Result<(), Error> {
        let mut state = self.state.lock();
        self.ensure_open_locked(&mut state)?;

        let gain = db_to_linear(volume_db);
        let Some(device) = state.device.clone()
        else {
            return Err(Error::NoDevice);
        };
        let mode = self.policy.write_mode(&device);

        tracing::debug!(device = %device, ?mode, gain, "Writing samples");

        match mode {
            WriteMode::WholeBuffer => {
                let samples: Vec<f32> = buffers
                    .iter()
                    .flat_map(|buffer| buffer.as_ref().iter().copied())
                    .collect();
                self.write_chunk(&mut state, &samples, gain, mode)?;
            }
            WriteMode::Chunked { chunk_size } => {
                for buffer in buffers {
                    for chunk in buffer.as_ref().chunks(chunk_size) {
                        self.write_chunk(&mut state, chunk, gain, mode)?;
                    }
                }

                self.drain(&mut state)?;
            }
        }

        Ok(())
    }

    fn ensure_open_locked(&self, state: &mut SinkState<B::Stream>) -> Result<SampleFormat, Error> {
        if state.available {
            if let (Some(_), Some(format)) = (&state.stream, state.format) {
                return Ok(format);
            }
        }

        if state.device.is_none() {
            state.device = Some(resolve_device(&self.backend, None)?);
        }
        self.reopen(state)
    }

    fn reopen(&self, state: &mut SinkState<B::Stream>) -> Result<SampleFormat, Error> {
        state.mark_unavailable();

        let Some(device) = state.device.as_ref()
        else {
            return Err(Error::NoDevice);
        };

        let mut last_error: BackendError = "no sample format to try".into();
        for format in SampleFormat::NEGOTIATION_ORDER {
            let config = StreamConfig {
                sample_rate: self.sample_rate,
                channels: 1,
                format,
            };

            match self.backend.open_stream(device, &config) {
                Ok(stream) => {
                    tracing::info!(device = %device, %format, sample_rate = self.sample_rate, "Opened output stream");
                    state.stream = Some(stream);
                    state.format = Some(format);
                    state.available = true;
                    return Ok(format);
                }
                Err(error) => {
                    tracing::debug!(device = %device, %format, %error, "Sample format rejected");
                    last_error = error;
                }
            }
        }

        state.format = None;
        Err(Error::Negotiation {
            device: device.name.clone(),
            source: last_error,
        })
    }

    fn write_chunk(
        &self,
        state: &mut SinkState<B::Stream>,
        chunk: &[f32],
        gain: f32,
        mode: WriteMode,
    ) -> Result<(), Error> {
        let Err(error) = Self::try_write(state, chunk, gain, mode)
        else {
            return Ok(());
        };

        tracing::warn!(device = %state.device_name(), %error, "Write failed, reopening output stream");
        state.mark_unavailable();
        self.reopen(state)?;

        Self::try_write(state, chunk, gain, mode).map_err(|source| {
            state.mark_unavailable();
            Error::Write {
                device: state.device_name(),
                source,
            }
        })
    }

    /// Waits for queued samples. Stream errors often only show up here, so a
    /// failure reopens the stream once like a failed write.
    fn drain(&self, state: &mut SinkState<B::Stream>) -> Result<(), Error> {
        let Err(error) = Self::try_drain(state)
        else {
            return Ok(());
        };

        tracing::warn!(device = %state.device_name(), %error, "Drain failed, reopening output stream");
        state.mark_unavailable();
        self.reopen(state)?;

        Self::try_drain(state).map_err(|source| {
            state.mark_unavailable();
            Error::Write {
                device: state.device_name(),
                source,
            }
        })
    }

    fn try_drain(state: &mut SinkState<B::Stream>) -> Result<(), BackendError> {
        match state.stream.as_mut() {
            Some(stream) => stream.drain(),
            None => Err("output stream closed".into()),
        }
    }

    /// Converts per attempt, since a reopened stream may use another format.
    fn try_write(
        state: &mut SinkState<B::Stream>,
        chunk: &[f32],
        gain: f32,
        mode: WriteMode,
    ) -> Result<(), BackendError> {
        let (Some(stream), Some(format)) = (state.stream.as_mut(), state.format)
        else {
            return Err("output stream closed".into());
        };

        let buffer = SampleBuffer::convert(chunk, gain, format);
        match mode {
            WriteMode::Chunked { .. } => stream.write(buffer.as_samples()),
            WriteMode::WholeBuffer => stream.play(buffer.as_samples()),
        }
    }
}
