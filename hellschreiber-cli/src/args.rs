use std::path::PathBuf;

use clap::{
    Parser,
    Subcommand,
    ValueEnum,
};
use hellschreiber::audio::SampleFormat;

#[derive(Debug, Parser)]
pub struct Args {
    /// Settings file. Defaults to `config.toml` in the config directory.
    #[clap(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log to stderr instead of the log file.
    #[clap(long, global = true)]
    pub log_stderr: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Key the transmitter and send text.
    Send {
        text: String,

        #[clap(flatten)]
        output: OutputArgs,

        /// Serial port that keys the transmitter.
        #[clap(short, long)]
        port: Option<String>,

        /// Key with RTS.
        #[clap(long)]
        rts: bool,

        /// Key with DTR.
        #[clap(long)]
        dtr: bool,
    },
    /// Render text into a WAV file.
    Render {
        text: String,

        output: PathBuf,

        #[clap(short, long, default_value = "f32")]
        format: WavFormat,

        #[clap(flatten)]
        fonts: FontArgs,

        /// Volume in dB.
        #[clap(short, long)]
        volume: Option<f32>,

        #[clap(long)]
        no_markers: bool,
    },
    /// List output devices.
    Devices,
    /// List serial ports.
    Ports,
    /// Print glyphs of a font table.
    Show {
        table: PathBuf,

        characters: String,
    },
    /// Convert bitmap fonts into font tables, or export a table.
    #[clap(subcommand)]
    Convert(ConvertCommand),
}

#[derive(Debug, clap::Args)]
pub struct OutputArgs {
    /// Output device name.
    #[clap(short, long)]
    pub device: Option<String>,

    /// Volume in dB.
    #[clap(short, long)]
    pub volume: Option<f32>,

    /// Send the text without the `...` markers around it.
    #[clap(long)]
    pub no_markers: bool,

    #[clap(flatten)]
    pub fonts: FontArgs,
}

#[derive(Debug, clap::Args)]
pub struct FontArgs {
    /// Font table for ASCII characters.
    #[clap(long)]
    pub primary_font: Option<PathBuf>,

    /// Font table for everything else.
    #[clap(long)]
    pub secondary_font: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum ConvertCommand {
    /// BDF bitmap font.
    Bdf { input: PathBuf, output: PathBuf },
    /// C++ source with `{ 'c', { columns... } }` entries.
    Cxx { input: PathBuf, output: PathBuf },
    /// Export a font table as a TypeScript glyph module.
    Export { table: PathBuf, output: PathBuf },
    /// Row-major glyph words in brace blocks, one glyph after the other.
    Rows {
        input: PathBuf,

        output: PathBuf,

        /// Code point of the first glyph.
        #[clap(long, default_value = "32")]
        start: u32,

        /// Row words per glyph.
        #[clap(long, default_value = "14")]
        rows: usize,

        /// Minimum columns per glyph.
        #[clap(long, default_value = "14")]
        cols: usize,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum WavFormat {
    F32,
    I16,
}

impl From<WavFormat> for SampleFormat {
    fn from(value: WavFormat) -> Self {
        match value {
            WavFormat::F32 => Self::F32,
            WavFormat::I16 => Self::I16,
        }
    }
}
