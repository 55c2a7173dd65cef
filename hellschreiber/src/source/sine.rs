use std::f32::consts::TAU;

use crate::source::SignalGenerator;

#[inline]
fn step_from_frequency_and_sample_rate(frequency: f32, sample_rate: f32) -> f32 {
    (TAU * frequency / sample_rate).rem_euclid(TAU)
}

#[derive(Clone, Copy, Debug)]
pub struct SineWave {
    frequency: f32,
    sample_rate: f32,
    phase: f32,
    step: f32,
}

impl SineWave {
    pub fn new(frequency: f32, sample_rate: f32) -> Self {
        Self {
            frequency,
            sample_rate,
            phase: 0.0,
            step: step_from_frequency_and_sample_rate(frequency, sample_rate),
        }
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl SignalGenerator for SineWave {
    type Sample = f32;

    fn next(&mut self) -> Self::Sample {
        let output = self.phase.sin();
        self.phase += self.step;
        if self.phase > TAU {
            self.phase -= TAU;
        }
        output
    }
}

#[inline]
pub fn sine(frequency: f32, sample_rate: f32) -> SineWave {
    SineWave::new(frequency, sample_rate)
}
