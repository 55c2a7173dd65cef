use std::time::Duration;

use crate::{
    config::{
        self,
        MarkerConfig,
        ModemConfig,
    },
    font::{
        FontSet,
        Lookup,
    },
    modem::CharacterEncoder,
    util::samples_to_duration,
};

/// Turns text into sample buffers.
#[derive(Clone, Debug)]
pub struct TransmissionAssembler {
    fonts: FontSet,
    encoder: CharacterEncoder,
    gap: usize,
    sample_rate: u32,
    markers: MarkerConfig,
}

impl TransmissionAssembler {
    pub fn new(fonts: FontSet, config: &ModemConfig) -> Result<Self, config::Error> {
        let encoder = CharacterEncoder::from_config(config)?;

        if fonts.width() != encoder.width() {
            return Err(config::Error::FontWidthMismatch {
                font_width: fonts.width(),
                glyph_width: encoder.width(),
            });
        }

        Ok(Self {
            fonts,
            encoder,
            gap: config.gap_samples(),
            sample_rate: config.sample_rate,
            markers: config.markers.clone(),
        })
    }

    #[inline]
    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    #[inline]
    pub fn encoder(&self) -> &CharacterEncoder {
        &self.encoder
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn wrap_markers(&self, text: &str) -> String {
        format!("{}{text}{}", self.markers.prefix, self.markers.suffix)
    }

    /// Encodes every character of `text`.
    ///
    /// Characters without a glyph are sent as silence of the same length. If
    /// a gap is configured it follows every character except the last.
    pub fn assemble(&self, text: &str) -> TransmissionJob {
        let text: Vec<char> = text.chars().collect();
        let mut buffers = Vec::with_capacity(text.len() * 2);
        let mut char_buffer_indices = Vec::with_capacity(text.len());
        let mut schedule = Vec::with_capacity(text.len());
        let mut total = 0;

        for (index, character) in text.iter().enumerate() {
            let buffer = match self.fonts.lookup(*character) {
                Lookup::Found { glyph, .. } => self.encoder.encode(glyph),
                Lookup::Blank => self.encoder.blank(),
            };
            total += buffer.len();
            char_buffer_indices.push(buffers.len());
            buffers.push(buffer);

            if self.gap > 0 && index + 1 < text.len() {
                total += self.gap;
                buffers.push(vec![0.0; self.gap]);
            }

            schedule.push(total);
        }

        tracing::debug!(
            characters = text.len(),
            buffers = buffers.len(),
            samples = total,
            "Assembled transmission"
        );

        TransmissionJob {
            text,
            buffers,
            char_buffer_indices,
            schedule,
            sample_rate: self.sample_rate,
        }
    }
}

/// Encoded text, ready to play.
#[derive(Clone, Debug)]
pub struct TransmissionJob {
    text: Vec<char>,
    buffers: Vec<Vec<f32>>,
    char_buffer_indices: Vec<usize>,
    schedule: Vec<usize>,
    sample_rate: u32,
}

impl TransmissionJob {
    #[inline]
    pub fn text(&self) -> &[char] {
        &self.text
    }

    /// Character and gap buffers in playback order.
    #[inline]
    pub fn buffers(&self) -> &[Vec<f32>] {
        &self.buffers
    }

    /// Buffer index of each character.
    #[inline]
    pub fn char_buffer_indices(&self) -> &[usize] {
        &self.char_buffer_indices
    }

    /// Sample offset at which each character, including the gap after it,
    /// has been played.
    #[inline]
    pub fn schedule(&self) -> &[usize] {
        &self.schedule
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn num_characters(&self) -> usize {
        self.text.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn num_samples(&self) -> usize {
        self.buffers.iter().map(Vec::len).sum()
    }

    pub fn duration(&self) -> Duration {
        samples_to_duration(self.num_samples(), self.sample_rate)
    }

    pub fn concatenated(&self) -> Vec<f32> {
        self.buffers.concat()
    }

    /// Time after playback start at which each character should be marked as
    /// sent.
    pub fn completion_offsets(&self, skew: Duration) -> Vec<Duration> {
        self.schedule
            .iter()
            .map(|samples| samples_to_duration(*samples, self.sample_rate) + skew)
            .collect()
    }
}
