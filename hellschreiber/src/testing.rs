//! Recording backends for tests.

use std::{
    sync::Arc,
    time::{
        Duration,
        Instant,
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
    ptt::{
        ControlLines,
        LinesOpener,
    },
};

#[derive(Clone, Debug, PartialEq)]
pub enum OutputEvent {
    Open {
        device: String,
        format: SampleFormat,
    },
    Write {
        len: usize,
        format: SampleFormat,
    },
    Play {
        len: usize,
        format: SampleFormat,
    },
    Drain,
    Failed,
}

#[derive(Debug, Default)]
struct OutputState {
    devices: Vec<OutputDevice>,
    default_device: Option<usize>,
    rejected_formats: Vec<SampleFormat>,
    failing_writes: usize,
    failing_drains: usize,
    open_delay: Option<Duration>,
    write_delay: Option<Duration>,
    events: Vec<(Instant, OutputEvent)>,
    samples: Vec<(SampleFormat, Vec<f32>)>,
    i16_samples: Vec<i16>,
}

impl OutputState {
    fn push(&mut self, event: OutputEvent) {
        self.events.push((Instant::now(), event));
    }
}

/// Output backend that records everything written to it.
#[derive(Clone, Debug)]
pub struct MockOutput {
    state: Arc<Mutex<OutputState>>,
}

impl Default for MockOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOutput {
    /// A backend with one default device, `Mock Speakers` on host `Mock`.
    pub fn new() -> Self {
        Self::without_devices()
            .with_device("Mock Speakers", "Mock")
            .with_default(0)
    }

    pub fn without_devices() -> Self {
        Self {
            state: Default::default(),
        }
    }

    pub fn with_device(self, name: &str, host: &str) -> Self {
        self.state.lock().devices.push(OutputDevice {
            id: format!("{host}:{name}"),
            name: name.to_owned(),
            host: host.to_owned(),
        });
        self
    }

    pub fn with_default(self, index: usize) -> Self {
        self.state.lock().default_device = Some(index);
        self
    }

    pub fn reject_format(self, format: SampleFormat) -> Self {
        self.state.lock().rejected_formats.push(format);
        self
    }

    /// Makes every write take at least `delay`.
    pub fn with_write_delay(self, delay: Duration) -> Self {
        self.state.lock().write_delay = Some(delay);
        self
    }

    /// Makes opening a stream take at least `delay`.
    pub fn with_open_delay(self, delay: Duration) -> Self {
        self.state.lock().open_delay = Some(delay);
        self
    }

    /// Fails the next `count` drains.
    pub fn fail_next_drains(&self, count: usize) {
        self.state.lock().failing_drains = count;
    }

    /// Fails the next `count` writes.
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().failing_writes = count;
    }

    pub fn events(&self) -> Vec<OutputEvent> {
        self.state
            .lock()
            .events
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn timed_events(&self) -> Vec<(Instant, OutputEvent)> {
        self.state.lock().events.clone()
    }

    /// All successfully written samples, as floats.
    pub fn written_f32(&self) -> Vec<f32> {
        self.state
            .lock()
            .samples
            .iter()
            .flat_map(|(_, samples)| samples.iter().copied())
            .collect()
    }

    /// All successfully written integer samples.
    pub fn written_i16(&self) -> Vec<i16> {
        self.state.lock().i16_samples.clone()
    }
}

impl OutputBackend for MockOutput {
    type Stream = MockStream;

    fn output_devices(&self) -> Result<Vec<OutputDevice>, BackendError> {
        Ok(self.state.lock().devices.clone())
    }

    fn default_output_device(&self) -> Result<Option<OutputDevice>, BackendError> {
        let state = self.state.lock();
        Ok(state
            .default_device
            .and_then(|index| state.devices.get(index).cloned()))
    }

    fn open_stream(
        &self,
        device: &OutputDevice,
        config: &StreamConfig,
    ) -> Result<Self::Stream, BackendError> {
        let open_delay = self.state.lock().open_delay;
        if let Some(delay) = open_delay {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock();
        if state.rejected_formats.contains(&config.format) {
            return Err(format!("{} not supported", config.format).into());
        }
        state.push(OutputEvent::Open {
            device: device.name.clone(),
            format: config.format,
        });
        Ok(MockStream {
            state: self.state.clone(),
            format: config.format,
        })
    }
}

#[derive(Debug)]
pub struct MockStream {
    state: Arc<Mutex<OutputState>>,
    format: SampleFormat,
}

impl MockStream {
    fn record(&self, samples: Samples<'_>, event: OutputEvent) -> Result<(), BackendError> {
        let delay = {
            let mut state = self.state.lock();
            if state.failing_writes > 0 {
                state.failing_writes -= 1;
                state.push(OutputEvent::Failed);
                return Err("device unplugged".into());
            }
            if samples.format() != self.format {
                return Err("sample format mismatch".into());
            }

            state.push(event);
            if let Samples::I16(samples) = samples {
                state.i16_samples.extend_from_slice(samples);
            }
            state.samples.push((samples.format(), samples.to_f32_vec()));
            state.write_delay
        };

        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        Ok(())
    }
}

impl OutputStream for MockStream {
    fn write(&mut self, samples: Samples<'_>) -> Result<(), BackendError> {
        let event = OutputEvent::Write {
            len: samples.len(),
            format: samples.format(),
        };
        self.record(samples, event)
    }

    fn play(&mut self, samples: Samples<'_>) -> Result<(), BackendError> {
        let event = OutputEvent::Play {
            len: samples.len(),
            format: samples.format(),
        };
        self.record(samples, event)
    }

    fn drain(&mut self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if state.failing_drains > 0 {
            state.failing_drains -= 1;
            state.push(OutputEvent::Failed);
            return Err("stream error".into());
        }
        state.push(OutputEvent::Drain);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineEvent {
    Open(String),
    Close(String),
    Rts(bool),
    Dtr(bool),
}

#[derive(Debug, Default)]
struct LinesState {
    events: Vec<(Instant, LineEvent)>,
    open_ports: Vec<String>,
    fail_open: bool,
}

/// Serial control lines that record every change. Clones share the record.
#[derive(Clone, Debug, Default)]
pub struct MockLines {
    state: Arc<Mutex<LinesState>>,
}

impl MockLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes opening any port fail.
    pub fn fail_open(self) -> Self {
        self.state.lock().fail_open = true;
        self
    }

    pub fn events(&self) -> Vec<LineEvent> {
        self.state
            .lock()
            .events
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn timed_events(&self) -> Vec<(Instant, LineEvent)> {
        self.state.lock().events.clone()
    }

    pub fn clear(&self) {
        self.state.lock().events.clear();
    }

    pub fn open_ports(&self) -> Vec<String> {
        self.state.lock().open_ports.clone()
    }

    fn push(&self, event: LineEvent) {
        self.state.lock().events.push((Instant::now(), event));
    }
}

impl LinesOpener for MockLines {
    type Lines = MockPort;

    fn open(&self, port: &str) -> Result<Self::Lines, BackendError> {
        if self.state.lock().fail_open {
            return Err(format!("no such port: {port}").into());
        }
        self.state.lock().open_ports.push(port.to_owned());
        self.push(LineEvent::Open(port.to_owned()));
        Ok(MockPort {
            name: port.to_owned(),
            record: self.clone(),
        })
    }
}

#[derive(Debug)]
pub struct MockPort {
    name: String,
    record: MockLines,
}

impl ControlLines for MockPort {
    fn set_rts(&mut self, level: bool) -> Result<(), BackendError> {
        self.record.push(LineEvent::Rts(level));
        Ok(())
    }

    fn set_dtr(&mut self, level: bool) -> Result<(), BackendError> {
        self.record.push(LineEvent::Dtr(level));
        Ok(())
    }
}

impl Drop for MockPort {
    fn drop(&mut self) {
        self.record
            .state
            .lock()
            .open_ports
            .retain(|port| *port != self.name);
        self.record.push(LineEvent::Close(self.name.clone()));
    }
}
