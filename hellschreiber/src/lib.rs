//! Feld Hell transmitter.
//!
//! Text is rendered into column-encoded glyphs, each pixel becoming a fixed
//! length burst of tone or silence. The resulting audio is played while the
//! transmitter is keyed through a serial port.

pub mod audio;
pub mod config;
pub mod convert;
pub mod font;
pub mod glyph;
pub mod modem;
pub mod ptt;
pub mod source;
pub mod testing;
pub mod transmit;
pub mod util;

pub use crate::{
    config::HellConfig,
    font::{
        FontSet,
        FontTable,
    },
    glyph::Glyph,
    modem::{
        TransmissionAssembler,
        TransmissionJob,
    },
    transmit::{
        TransmitError,
        TransmitState,
        Transmitter,
    },
};

/// Error type of the device backends.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;
