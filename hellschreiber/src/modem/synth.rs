use crate::{
    config::{
        self,
        ModemConfig,
    },
    source::{
        SignalGenerator,
        sine,
    },
};

/// Renders single pixels.
///
/// Every tone pixel starts at phase zero, so the tone is computed once and
/// copied.
#[derive(Clone, Debug)]
pub struct PixelSynthesizer {
    tone: Box<[f32]>,
}

impl PixelSynthesizer {
    pub fn new(frequency: f32, amplitude: f32, sample_rate: u32, samples_per_pixel: usize) -> Self {
        let tone = sine(frequency, sample_rate as f32)
            .take_samples(samples_per_pixel)
            .into_iter()
            .map(|sample| sample * amplitude)
            .collect();
        Self { tone }
    }

    pub fn from_config(config: &ModemConfig) -> Result<Self, config::Error> {
        config.validate()?;
        Ok(Self::new(
            config.tone.frequency,
            config.tone.amplitude,
            config.sample_rate,
            config.samples_per_pixel(),
        ))
    }

    #[inline]
    pub fn samples_per_pixel(&self) -> usize {
        self.tone.len()
    }

    #[inline]
    pub fn tone(&self) -> &[f32] {
        &self.tone
    }

    pub fn synthesize_pixel(&self, on: bool) -> Vec<f32> {
        let mut buffer = vec![0.0; self.samples_per_pixel()];
        self.write_pixel(on, &mut buffer);
        buffer
    }

    /// Writes one pixel into `output`, which must be exactly one pixel long.
    #[inline]
    pub fn write_pixel(&self, on: bool, output: &mut [f32]) {
        if on {
            output.copy_from_slice(&self.tone);
        }
        else {
            output.fill(0.0);
        }
    }
}
