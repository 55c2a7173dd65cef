use crate::{
    config::{
        self,
        ModemConfig,
    },
    glyph::Glyph,
    modem::PixelSynthesizer,
};

/// Turns glyphs into fixed-length sample buffers.
#[derive(Clone, Debug)]
pub struct CharacterEncoder {
    synth: PixelSynthesizer,
    width: usize,
    height: usize,
    tail_silence: usize,
}

impl CharacterEncoder {
    pub fn new(synth: PixelSynthesizer, width: usize, height: usize, tail_silence: usize) -> Self {
        Self {
            synth,
            width,
            height,
            tail_silence,
        }
    }

    pub fn from_config(config: &ModemConfig) -> Result<Self, config::Error> {
        Ok(Self::new(
            PixelSynthesizer::from_config(config)?,
            config.glyph_width,
            config.pixel_height,
            config.tail_silence_samples(),
        ))
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn samples_per_pixel(&self) -> usize {
        self.synth.samples_per_pixel()
    }

    /// Samples per character.
    #[inline]
    pub fn char_len(&self) -> usize {
        self.width * self.height * self.samples_per_pixel()
    }

    /// Encodes `glyph`, reading `width` columns and the low `height` bits of
    /// each. Missing columns are blank.
    pub fn encode(&self, glyph: &Glyph) -> Vec<f32> {
        let samples_per_pixel = self.samples_per_pixel();
        let mut buffer = vec![0.0; self.char_len()];
        let mut position = 0;

        for x in 0..self.width {
            let column = glyph.column(x);
            for y in 0..self.height as u32 {
                let on = column.checked_shr(y).unwrap_or_default() & 1 != 0;
                self.synth
                    .write_pixel(on, &mut buffer[position..position + samples_per_pixel]);
                position += samples_per_pixel;
            }
        }

        // sync gap for decoders, if there is room left
        if let Some(tail) = buffer.get_mut(position..position + self.tail_silence) {
            tail.fill(0.0);
        }

        buffer
    }

    /// Buffer for characters without a glyph.
    pub fn blank(&self) -> Vec<f32> {
        vec![0.0; self.char_len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> CharacterEncoder {
        CharacterEncoder::new(PixelSynthesizer::new(1000.0, 0.5, 48_000, 10), 3, 4, 48)
    }

    #[test]
    fn length_is_independent_of_pattern() {
        let encoder = encoder();
        for columns in [vec![], vec![0xf, 0xf, 0xf], vec![0x1], vec![0xffff_ffff; 20]] {
            let glyph = Glyph::new(columns.iter().copied(), columns.len());
            assert_eq!(encoder.encode(&glyph).len(), 3 * 4 * 10);
        }
    }

    #[test]
    fn pixels_are_sent_bottom_up_left_to_right() {
        let encoder = encoder();
        let tone = encoder.synth.synthesize_pixel(true);
        let samples = encoder.encode(&Glyph::new([0b0010, 0, 0b1000], 3));

        let pixel = |index: usize| &samples[index * 10..(index + 1) * 10];
        for index in 0..12 {
            let expected_on = index == 1 || index == 11;
            if expected_on {
                assert_eq!(pixel(index), tone.as_slice(), "pixel {index}");
            }
            else {
                assert!(pixel(index).iter().all(|s| *s == 0.0), "pixel {index}");
            }
        }
    }

    #[test]
    fn bits_above_height_are_ignored() {
        let encoder = encoder();
        let glyph = Glyph::new([0b1_0000], 3);
        assert_eq!(encoder.encode(&glyph), encoder.blank());
    }
}
