use std::{
    sync::{
        Arc,
        mpsc,
    },
    thread,
    time::Duration,
};

use ::rodio::{
    OutputStreamBuilder,
    Sink,
    buffer::SamplesBuffer,
    cpal::{
        self,
        traits::{
            DeviceTrait,
            HostTrait,
        },
    },
};
use parking_lot::Mutex;

use crate::{
    BackendError,
    audio::{
        OutputBackend,
        OutputDevice,
        OutputStream,
        SampleFormat,
        Samples,
        StreamConfig,
    },
};

/// Chunks queued ahead of the one playing.
const QUEUE_AHEAD: usize = 2;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Sound cards of all available hosts, through rodio and cpal.
#[derive(Clone, Copy, Debug, Default)]
pub struct RodioBackend;

impl RodioBackend {
    fn find_device(&self, device: &OutputDevice) -> Result<cpal::Device, BackendError> {
        for host_id in cpal::available_hosts() {
            if host_id.name() != device.host {
                continue;
            }
            let host = cpal::host_from_id(host_id)?;
            for candidate in host.output_devices()? {
                if candidate.name().ok().as_deref() == Some(device.name.as_str()) {
                    return Ok(candidate);
                }
            }
        }
        Err(format!("output device not found: {device}").into())
    }
}

fn output_device(host: cpal::HostId, device: &cpal::Device) -> Option<OutputDevice> {
    let name = device.name().ok()?;
    Some(OutputDevice {
        id: format!("{}:{name}", host.name()),
        name,
        host: host.name().to_owned(),
    })
}

impl OutputBackend for RodioBackend {
    type Stream = RodioStream;

    fn output_devices(&self) -> Result<Vec<OutputDevice>, BackendError> {
        let mut devices = vec![];

        for host_id in cpal::available_hosts() {
            let host = match cpal::host_from_id(host_id) {
                Ok(host) => host,
                Err(error) => {
                    tracing::debug!(host = host_id.name(), %error, "Host unavailable");
                    continue;
                }
            };
            devices.extend(
                host.output_devices()?
                    .filter_map(|device| output_device(host_id, &device)),
            );
        }

        Ok(devices)
    }

    fn default_output_device(&self) -> Result<Option<OutputDevice>, BackendError> {
        let host = cpal::default_host();
        Ok(host
            .default_output_device()
            .and_then(|device| output_device(host.id(), &device)))
    }

    fn open_stream(
        &self,
        device: &OutputDevice,
        config: &StreamConfig,
    ) -> Result<Self::Stream, BackendError> {
        let cpal_device = self.find_device(device)?;
        RodioStream::open(cpal_device, *config)
    }
}

/// A rodio output stream.
///
/// The stream itself is not `Send`, so it lives on its own thread until this
/// handle is dropped. Samples are handed over through a [`Sink`].
#[derive(derive_more::Debug)]
pub struct RodioStream {
    #[debug(skip)]
    sink: Sink,
    sample_rate: u32,
    channels: u16,
    stream_error: Arc<Mutex<Option<String>>>,
    _keep_alive: mpsc::Sender<()>,
}

impl RodioStream {
    fn open(device: cpal::Device, config: StreamConfig) -> Result<Self, BackendError> {
        let (ready_sender, ready_receiver) = mpsc::sync_channel(1);
        let (keep_alive_sender, keep_alive_receiver) = mpsc::channel::<()>();
        let stream_error = Arc::new(Mutex::new(None));

        let sample_format = match config.format {
            SampleFormat::F32 => cpal::SampleFormat::F32,
            SampleFormat::I16 => cpal::SampleFormat::I16,
        };

        thread::Builder::new()
            .name("hell-audio".to_owned())
            .spawn({
                let stream_error = stream_error.clone();
                move || {
                    let opened = OutputStreamBuilder::from_device(device).and_then(|builder| {
                        builder
                            .with_sample_rate(config.sample_rate)
                            .with_channels(config.channels)
                            .with_sample_format(sample_format)
                            .with_error_callback(move |error| {
                                tracing::warn!(%error, "Output stream error");
                                *stream_error.lock() = Some(error.to_string());
                            })
                            .open_stream()
                    });

                    match opened {
                        Ok(mut stream) => {
                            stream.log_on_drop(false);
                            let sink = Sink::connect_new(stream.mixer());
                            if ready_sender.send(Ok(sink)).is_ok() {
                                // returns once the handle is dropped
                                let _ = keep_alive_receiver.recv();
                            }
                        }
                        Err(error) => {
                            let _ = ready_sender.send(Err(error));
                        }
                    }
                }
            })?;

        let sink = ready_receiver.recv()??;

        Ok(Self {
            sink,
            sample_rate: config.sample_rate,
            channels: config.channels,
            stream_error,
            _keep_alive: keep_alive_sender,
        })
    }

    fn check_error(&self) -> Result<(), BackendError> {
        match self.stream_error.lock().take() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    fn append(&self, samples: Samples<'_>) -> Result<(), BackendError> {
        self.check_error()?;
        self.sink.append(SamplesBuffer::new(
            self.channels,
            self.sample_rate,
            samples.to_f32_vec(),
        ));
        Ok(())
    }

    fn wait_until(&self, done: impl Fn(&Sink) -> bool) -> Result<(), BackendError> {
        while !done(&self.sink) {
            self.check_error()?;
            thread::sleep(POLL_INTERVAL);
        }
        self.check_error()
    }
}

impl OutputStream for RodioStream {
    fn write(&mut self, samples: Samples<'_>) -> Result<(), BackendError> {
        self.append(samples)?;
        self.wait_until(|sink| sink.len() <= QUEUE_AHEAD)
    }

    fn play(&mut self, samples: Samples<'_>) -> Result<(), BackendError> {
        self.append(samples)?;
        self.wait_until(Sink::empty)
    }

    fn drain(&mut self) -> Result<(), BackendError> {
        self.wait_until(Sink::empty)
    }
}
