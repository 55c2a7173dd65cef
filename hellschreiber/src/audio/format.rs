use std::fmt::{
    self,
    Display,
};

use serde::{
    Deserialize,
    Serialize,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    F32,
    I16,
}

impl SampleFormat {
    /// Formats tried when opening a stream, preferred first.
    pub const NEGOTIATION_ORDER: [Self; 2] = [Self::F32, Self::I16];
}

impl Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => f.write_str("f32"),
            Self::I16 => f.write_str("i16"),
        }
    }
}

#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32767.0
}

/// Samples in the negotiated stream format.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Samples<'a> {
    F32(&'a [f32]),
    I16(&'a [i16]),
}

impl Samples<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Samples::F32(samples) => samples.len(),
            Samples::I16(samples) => samples.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn format(&self) -> SampleFormat {
        match self {
            Samples::F32(_) => SampleFormat::F32,
            Samples::I16(_) => SampleFormat::I16,
        }
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            Samples::F32(samples) => samples.to_vec(),
            Samples::I16(samples) => samples.iter().copied().map(i16_to_f32).collect(),
        }
    }
}

/// Owned counterpart of [`Samples`].
#[derive(Clone, Debug, PartialEq)]
pub enum SampleBuffer {
    F32(Vec<f32>),
    I16(Vec<i16>),
}

impl SampleBuffer {
    /// Scales `samples` by `gain` and converts them to `format`.
    pub fn convert(samples: &[f32], gain: f32, format: SampleFormat) -> Self {
        match format {
            SampleFormat::F32 => Self::F32(samples.iter().map(|sample| sample * gain).collect()),
            SampleFormat::I16 => {
                Self::I16(
                    samples
                        .iter()
                        .map(|sample| f32_to_i16(sample * gain))
                        .collect(),
                )
            }
        }
    }

    #[inline]
    pub fn as_samples(&self) -> Samples<'_> {
        match self {
            Self::F32(samples) => Samples::F32(samples),
            Self::I16(samples) => Samples::I16(samples),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_conversion_clamps() {
        assert_eq!(f32_to_i16(1.0), 32767);
        assert_eq!(f32_to_i16(-1.0), -32767);
        assert_eq!(f32_to_i16(2.5), 32767);
        assert_eq!(f32_to_i16(-7.0), -32767);
        assert_eq!(f32_to_i16(0.0), 0);
    }

    #[test]
    fn conversion_applies_gain() {
        let buffer = SampleBuffer::convert(&[0.5, -0.5], 0.5, SampleFormat::I16);
        assert_eq!(buffer, SampleBuffer::I16(vec![8191, -8191]));

        let buffer = SampleBuffer::convert(&[0.5, -0.5], 0.5, SampleFormat::F32);
        assert_eq!(buffer, SampleBuffer::F32(vec![0.25, -0.25]));
    }
}
