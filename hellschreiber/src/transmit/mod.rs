//! Sending text.
//!
//! A [`Transmitter`] keys the transmitter, plays the encoded text and unkeys
//! again, all on a dedicated worker thread:
//!
//! ```plain
//! Idle -> KeyingUp -> Sending -> KeyingDown -> Idle
//!                        |
//!                        +-----> Aborted
//! ```

mod progress;

use std::{
    fmt::{
        self,
        Display,
    },
    sync::Arc,
    thread::{
        self,
        JoinHandle,
    },
    time::{
        Duration,
        Instant,
    },
};

use parking_lot::Mutex;

pub use self::progress::{
    ProgressSink,
    ProgressTimer,
};
use crate::{
    audio::{
        self,
        AudioSink,
        OutputBackend,
    },
    config::HellConfig,
    modem::{
        TransmissionAssembler,
        TransmissionJob,
    },
    ptt::{
        self,
        LinesOpener,
        PttController,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum TransmitError {
    #[error("a transmission is already running")]
    Busy,
    #[error("audio output failed")]
    Audio(#[from] audio::Error),
    #[error("ptt failed")]
    Ptt(#[from] ptt::Error),
    #[error("transmit worker panicked")]
    WorkerPanicked,
    #[error("failed to spawn thread")]
    Spawn(#[source] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransmitState {
    Idle,
    KeyingUp,
    Sending,
    KeyingDown,
    /// The last transmission failed. A new one may be started.
    Aborted,
}

impl TransmitState {
    #[inline]
    pub fn accepts_send(&self) -> bool {
        matches!(self, Self::Idle | Self::Aborted)
    }
}

impl Display for TransmitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::KeyingUp => "keying up",
            Self::Sending => "sending",
            Self::KeyingDown => "keying down",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransmitConfig {
    /// Between keying up and the first sample.
    pub lead: Duration,
    /// Between the last sample and keying down.
    pub trail: Duration,
    /// How far progress marks lag behind the estimated playback position.
    pub skew: Duration,
    pub volume_db: f32,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self::from_config(&HellConfig::default())
    }
}

impl TransmitConfig {
    pub fn from_config(config: &HellConfig) -> Self {
        Self {
            lead: config.timing.lead(),
            trail: config.timing.trail(),
            skew: config.timing.skew(),
            volume_db: config.sound.volume_db,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransmissionReport {
    pub characters: usize,
    pub samples: usize,
    /// Audio length of the job.
    pub duration: Duration,
    /// Wall time from keying up to keying down.
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct TransmissionHandle {
    thread: JoinHandle<Result<TransmissionReport, TransmitError>>,
}

impl TransmissionHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the transmission to end. The transmitter is unkeyed by then.
    pub fn join(self) -> Result<TransmissionReport, TransmitError> {
        self.thread
            .join()
            .map_err(|_| TransmitError::WorkerPanicked)?
    }
}

#[derive(derive_more::Debug)]
struct Shared<B: OutputBackend, O: LinesOpener> {
    sink: Arc<AudioSink<B>>,
    #[debug(skip)]
    ptt: Arc<Mutex<PttController<O>>>,
    state: Mutex<TransmitState>,
}

impl<B: OutputBackend, O: LinesOpener> Shared<B, O> {
    fn set_state(&self, state: TransmitState) {
        let mut current = self.state.lock();
        tracing::debug!(from = %*current, to = %state, "Transmit state");
        *current = state;
    }
}

/// Unkeys the transmitter if the worker leaves early.
struct KeyDownGuard<'a, B: OutputBackend, O: LinesOpener> {
    shared: &'a Shared<B, O>,
    armed: bool,
}

impl<B: OutputBackend, O: LinesOpener> KeyDownGuard<'_, B, O> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<B: OutputBackend, O: LinesOpener> Drop for KeyDownGuard<'_, B, O> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(error) = self.shared.ptt.lock().set(false) {
            tracing::error!(%error, "Failed to unkey transmitter");
        }
        self.shared.set_state(TransmitState::Aborted);
    }
}

/// Runs transmissions, one at a time.
#[derive(derive_more::Debug)]
pub struct Transmitter<B: OutputBackend, O: LinesOpener> {
    shared: Arc<Shared<B, O>>,
    assembler: TransmissionAssembler,
    config: TransmitConfig,
}

impl<B: OutputBackend, O: LinesOpener> Transmitter<B, O> {
    pub fn new(
        sink: Arc<AudioSink<B>>,
        ptt: Arc<Mutex<PttController<O>>>,
        assembler: TransmissionAssembler,
        config: TransmitConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                sink,
                ptt,
                state: Mutex::new(TransmitState::Idle),
            }),
            assembler,
            config,
        }
    }

    pub fn state(&self) -> TransmitState {
        *self.shared.state.lock()
    }

    #[inline]
    pub fn sink(&self) -> &Arc<AudioSink<B>> {
        &self.shared.sink
    }

    #[inline]
    pub fn ptt(&self) -> &Arc<Mutex<PttController<O>>> {
        &self.shared.ptt
    }

    #[inline]
    pub fn assembler(&self) -> &TransmissionAssembler {
        &self.assembler
    }

    #[inline]
    pub fn config(&self) -> &TransmitConfig {
        &self.config
    }

    pub fn set_volume_db(&mut self, volume_db: f32) {
        self.config.volume_db = volume_db;
    }

    /// Starts sending `text`.
    ///
    /// The output stream is opened before the transmitter is keyed, so a
    /// missing device fails here. `progress` receives the index of each
    /// character once it has been played.
    pub fn send<P: ProgressSink>(
        &self,
        text: &str,
        progress: P,
    ) -> Result<TransmissionHandle, TransmitError> {
        let previous = {
            let mut state = self.shared.state.lock();
            if !state.accepts_send() {
                return Err(TransmitError::Busy);
            }
            let previous = *state;
            tracing::debug!(from = %previous, to = %TransmitState::KeyingUp, "Transmit state");
            *state = TransmitState::KeyingUp;
            previous
        };

        self.start(text, progress).inspect_err(|_| {
            self.shared.set_state(previous);
        })
    }

    fn start<P: ProgressSink>(
        &self,
        text: &str,
        progress: P,
    ) -> Result<TransmissionHandle, TransmitError> {
        self.shared.sink.ensure_open()?;

        let job = self.assembler.assemble(text);

        let shared = self.shared.clone();
        let config = self.config;
        let thread = thread::Builder::new()
            .name("hell-transmit".to_owned())
            .spawn(move || run(&shared, &config, &job, progress))
            .map_err(TransmitError::Spawn)?;

        Ok(TransmissionHandle { thread })
    }
}

fn run<B: OutputBackend, O: LinesOpener, P: ProgressSink>(
    shared: &Shared<B, O>,
    config: &TransmitConfig,
    job: &TransmissionJob,
    progress: P,
) -> Result<TransmissionReport, TransmitError> {
    let started = Instant::now();
    let mut guard = KeyDownGuard {
        shared,
        armed: true,
    };

    shared.ptt.lock().set(true)?;
    thread::sleep(config.lead);

    shared.set_state(TransmitState::Sending);
    let timer =
        ProgressTimer::start(job.completion_offsets(config.skew), progress).map_err(TransmitError::Spawn)?;
    let written = shared
        .sink
        .write_buffers(job.buffers(), config.volume_db);

    match &written {
        Ok(()) => {
            timer.join();
            shared.set_state(TransmitState::KeyingDown);
        }
        Err(error) => {
            timer.cancel();
            tracing::error!(%error, "Transmission aborted");
            shared.set_state(TransmitState::Aborted);
        }
    }

    thread::sleep(config.trail);
    let keyed_down = shared.ptt.lock().set(false);
    guard.disarm();

    match (written, keyed_down) {
        (Ok(()), Ok(())) => {
            shared.set_state(TransmitState::Idle);
            let report = TransmissionReport {
                characters: job.num_characters(),
                samples: job.num_samples(),
                duration: job.duration(),
                elapsed: started.elapsed(),
            };
            tracing::info!(?report, "Transmission complete");
            Ok(report)
        }
        (Ok(()), Err(error)) => {
            shared.set_state(TransmitState::Aborted);
            Err(error.into())
        }
        (Err(error), Ok(())) => Err(error.into()),
        (Err(error), Err(ptt_error)) => {
            tracing::error!(error = %ptt_error, "Failed to unkey transmitter");
            Err(error.into())
        }
    }
}
