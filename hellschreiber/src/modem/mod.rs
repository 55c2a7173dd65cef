//! Feld Hell modulation.
//!
//! Glyphs are sent column by column, bottom pixel first. Every pixel is a
//! fixed number of samples of either tone or silence.
//!
//! # References
//!
//! - <https://www.qsl.net/zl1bpu/FUZZY/Feld.htm>

mod assembler;
mod encoder;
mod synth;

pub use self::{
    assembler::{
        TransmissionAssembler,
        TransmissionJob,
    },
    encoder::CharacterEncoder,
    synth::PixelSynthesizer,
};

pub const SAMPLE_RATE: u32 = 48_000;
pub const PIXEL_DURATION_MS: f64 = 4.045;

pub const TONE_FREQUENCY: f32 = 1000.0;
pub const TONE_AMPLITUDE: f32 = 0.5;

pub const TAIL_SILENCE_MS: f64 = 1.0;

pub const MARKER_PREFIX: &str = "...   ";
pub const MARKER_SUFFIX: &str = "   ...";
