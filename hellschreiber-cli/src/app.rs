use std::{
    io::{
        Stdout,
        Write,
    },
    sync::Arc,
};

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::{
        PrintStyledContent,
        Stylize,
    },
    terminal::{
        Clear,
        ClearType,
    },
};
use hellschreiber::{
    TransmissionAssembler,
    Transmitter,
    audio::{
        AudioSink,
        RodioBackend,
        WriteModePolicy,
    },
    ptt::{
        PttController,
        SerialOpener,
    },
    transmit::{
        TransmissionReport,
        TransmitConfig,
    },
};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::{
    Error,
    args::OutputArgs,
    files::Settings,
};

#[derive(Debug)]
enum AppEvent {
    CharacterSent { index: usize },
    Finished { result: Result<TransmissionReport, Error> },
}

/// Sends one text and shows its progress.
#[derive(derive_more::Debug)]
pub struct App {
    #[debug(skip)]
    transmitter: Transmitter<RodioBackend, SerialOpener>,
    text: Vec<char>,
    sent: usize,
    #[debug(skip)]
    stdout: Stdout,
}

impl App {
    pub fn new(settings: Settings, output: &OutputArgs, text: &str) -> Result<Self, Error> {
        let mut config = settings.hell.clone();
        if let Some(device) = &output.device {
            config.sound.device = Some(device.clone());
        }
        if let Some(volume) = output.volume {
            config.sound.volume_db = volume;
        }
        config.validate()?;

        let assembler =
            TransmissionAssembler::new(settings.font_set(&output.fonts)?, &config.modem)?;
        let text = if output.no_markers {
            text.to_owned()
        }
        else {
            assembler.wrap_markers(text)
        };

        let policy =
            WriteModePolicy::from_config(&config.sound, config.modem.samples_per_pixel());
        let sink = AudioSink::new(RodioBackend, policy, config.modem.sample_rate);
        let format = sink.select_device(config.sound.device.as_deref())?;
        if let Some(device) = sink.device() {
            tracing::info!(%device, %format, mode = ?sink.write_mode(), "Using output device");
        }

        let mut ptt = PttController::from_config(SerialOpener::from(&config.ptt), &config.ptt);
        if let Some(port) = &config.ptt.port {
            ptt.open(port)?;
        }

        let transmitter = Transmitter::new(
            Arc::new(sink),
            Arc::new(Mutex::new(ptt)),
            assembler,
            TransmitConfig::from_config(&config),
        );

        Ok(Self {
            transmitter,
            text: text.chars().collect(),
            sent: 0,
            stdout: std::io::stdout(),
        })
    }

    pub async fn run(&mut self) -> Result<TransmissionReport, Error> {
        let (event_sender, mut event_receiver) = mpsc::unbounded_channel();

        let text: String = self.text.iter().collect();
        let handle = self.transmitter.send(&text, {
            let event_sender = event_sender.clone();
            move |index: usize| {
                let _ = event_sender.send(AppEvent::CharacterSent { index });
            }
        })?;

        tokio::task::spawn_blocking(move || {
            let result = handle.join().map_err(Error::from);
            let _ = event_sender.send(AppEvent::Finished { result });
        });

        self.draw()?;

        while let Some(event) = event_receiver.recv().await {
            match event {
                AppEvent::CharacterSent { index } => {
                    self.sent = self.sent.max(index + 1);
                    self.draw()?;
                }
                AppEvent::Finished { result } => {
                    writeln!(self.stdout)?;
                    return result;
                }
            }
        }

        Err(Error::msg("transmit worker vanished"))
    }

    /// Sent characters red, pending ones dimmed.
    fn draw(&mut self) -> Result<(), Error> {
        let (sent, pending) = self.text.split_at(self.sent.min(self.text.len()));
        let sent: String = sent.iter().collect();
        let pending: String = pending.iter().collect();

        queue!(
            self.stdout,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            PrintStyledContent(sent.red()),
            PrintStyledContent(pending.dim()),
        )?;
        self.stdout.flush()?;
        Ok(())
    }
}
