use std::time::Duration;

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    glyph::{
        GLYPH_WIDTH,
        MAX_PIXEL_HEIGHT,
        PIXEL_HEIGHT,
    },
    modem,
    util::millis_to_samples,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sample rate must be positive")]
    ZeroSampleRate,
    #[error("pixel duration of {pixel_duration_ms} ms at {sample_rate} Hz is shorter than one sample")]
    ZeroSamplesPerPixel {
        pixel_duration_ms: f64,
        sample_rate: u32,
    },
    #[error("pixel height {0} out of range, expected 1 to {MAX_PIXEL_HEIGHT}")]
    InvalidPixelHeight(usize),
    #[error("glyph width must be at least 1")]
    ZeroGlyphWidth,
    #[error("tone frequency {frequency} Hz not representable at {sample_rate} Hz")]
    InvalidTone { frequency: f32, sample_rate: u32 },
    #[error("chunk size must be at least one pixel")]
    ZeroChunkSize,
    #[error("font width {font_width} differs from glyph width {glyph_width}")]
    FontWidthMismatch {
        font_width: usize,
        glyph_width: usize,
    },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HellConfig {
    pub modem: ModemConfig,
    pub sound: SoundConfig,
    pub ptt: PttConfig,
    pub timing: TimingConfig,
}

impl HellConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.modem.validate()?;
        self.sound.validate()?;
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    pub sample_rate: u32,
    pub pixel_duration_ms: f64,
    pub pixel_height: usize,
    pub glyph_width: usize,
    pub tone: ToneConfig,
    pub tail_silence_ms: f64,
    /// Silence between characters.
    pub gap_ms: f64,
    pub markers: MarkerConfig,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            sample_rate: modem::SAMPLE_RATE,
            pixel_duration_ms: modem::PIXEL_DURATION_MS,
            pixel_height: PIXEL_HEIGHT,
            glyph_width: GLYPH_WIDTH,
            tone: Default::default(),
            tail_silence_ms: modem::TAIL_SILENCE_MS,
            gap_ms: 0.0,
            markers: Default::default(),
        }
    }
}

impl ModemConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.sample_rate == 0 {
            return Err(Error::ZeroSampleRate);
        }
        if self.samples_per_pixel() == 0 {
            return Err(Error::ZeroSamplesPerPixel {
                pixel_duration_ms: self.pixel_duration_ms,
                sample_rate: self.sample_rate,
            });
        }
        if self.pixel_height == 0 || self.pixel_height > MAX_PIXEL_HEIGHT {
            return Err(Error::InvalidPixelHeight(self.pixel_height));
        }
        if self.glyph_width == 0 {
            return Err(Error::ZeroGlyphWidth);
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        if !(self.tone.frequency > 0.0 && self.tone.frequency < nyquist) {
            return Err(Error::InvalidTone {
                frequency: self.tone.frequency,
                sample_rate: self.sample_rate,
            });
        }
        Ok(())
    }

    /// Samples per pixel, truncated.
    #[inline]
    pub fn samples_per_pixel(&self) -> usize {
        millis_to_samples(self.pixel_duration_ms, self.sample_rate)
    }

    /// Samples per encoded character.
    #[inline]
    pub fn character_samples(&self) -> usize {
        self.glyph_width * self.pixel_height * self.samples_per_pixel()
    }

    #[inline]
    pub fn tail_silence_samples(&self) -> usize {
        millis_to_samples(self.tail_silence_ms, self.sample_rate)
    }

    #[inline]
    pub fn gap_samples(&self) -> usize {
        millis_to_samples(self.gap_ms, self.sample_rate)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub frequency: f32,
    /// Peak amplitude, relative to full scale.
    pub amplitude: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency: modem::TONE_FREQUENCY,
            amplitude: modem::TONE_AMPLITUDE,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub prefix: String,
    pub suffix: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            prefix: modem::MARKER_PREFIX.to_owned(),
            suffix: modem::MARKER_SUFFIX.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Output device name. The default device is used if not set.
    pub device: Option<String>,
    pub volume_db: f32,
    /// Hosts that get the whole job in one blocking call.
    pub whole_buffer_hosts: Vec<String>,
    /// Chunk size for streamed writes, in pixels.
    pub chunk_pixels: usize,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            device: None,
            volume_db: -20.0,
            whole_buffer_hosts: vec!["ASIO".to_owned()],
            chunk_pixels: 8,
        }
    }
}

impl SoundConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.chunk_pixels == 0 {
            return Err(Error::ZeroChunkSize);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PttConfig {
    pub port: Option<String>,
    pub rts: bool,
    pub dtr: bool,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    /// Delay between resetting the two lines when the port is opened.
    pub settle_ms: u64,
}

impl Default for PttConfig {
    fn default() -> Self {
        Self {
            port: None,
            rts: false,
            dtr: false,
            baud_rate: 9600,
            timeout_ms: 1000,
            settle_ms: 100,
        }
    }
}

impl PttConfig {
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[inline]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay between keying up and the first sample.
    pub lead_ms: u64,
    /// Delay between the last sample and keying down.
    pub trail_ms: u64,
    /// Lag of progress marks behind the estimated playback position.
    pub skew_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            lead_ms: 200,
            trail_ms: 200,
            skew_ms: 5,
        }
    }
}

impl TimingConfig {
    #[inline]
    pub fn lead(&self) -> Duration {
        Duration::from_millis(self.lead_ms)
    }

    #[inline]
    pub fn trail(&self) -> Duration {
        Duration::from_millis(self.trail_ms)
    }

    #[inline]
    pub fn skew(&self) -> Duration {
        Duration::from_millis(self.skew_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_give_194_samples_per_pixel() {
        let config = ModemConfig::default();
        config.validate().unwrap();
        assert_eq!(config.samples_per_pixel(), 194);
        assert_eq!(config.character_samples(), 14 * 14 * 194);
        assert_eq!(config.tail_silence_samples(), 48);
        assert_eq!(config.gap_samples(), 0);
    }

    #[test]
    fn rejects_pixels_shorter_than_a_sample() {
        let config = ModemConfig {
            sample_rate: 100,
            pixel_duration_ms: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::ZeroSamplesPerPixel { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_heights() {
        for pixel_height in [0, 33] {
            let config = ModemConfig {
                pixel_height,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(Error::InvalidPixelHeight(_))
            ));
        }
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: HellConfig = serde_json::from_str(r#"{ "modem": { "gap_ms": 10 }, "ptt": { "rts": true } }"#).unwrap();

        assert_eq!(config.modem.gap_samples(), 480);
        assert_eq!(config.modem.samples_per_pixel(), 194);
        assert!(config.ptt.rts);
        assert!(!config.ptt.dtr);
        assert_eq!(config.sound.volume_db, -20.0);
        assert_eq!(config.sound.whole_buffer_hosts, vec!["ASIO".to_owned()]);
        assert_eq!(config.timing.lead(), Duration::from_millis(200));
    }
}
