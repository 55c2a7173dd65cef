use std::{
    fs::File,
    io::{
        BufWriter,
        Seek,
        Write,
    },
    path::{
        Path,
        PathBuf,
    },
};

use crate::{
    BackendError,
    audio::{
        OutputBackend,
        OutputDevice,
        OutputStream,
        SampleFormat,
        Samples,
        StreamConfig,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("wav error")]
    Hound(#[from] hound::Error),
    #[error("wav stream closed")]
    Closed,
    #[error("expected {expected} samples, got {actual}")]
    FormatMismatch {
        expected: SampleFormat,
        actual: SampleFormat,
    },
}

#[inline]
fn wav_spec(config: &StreamConfig) -> hound::WavSpec {
    let (bits_per_sample, sample_format) = match config.format {
        SampleFormat::F32 => (32, hound::SampleFormat::Float),
        SampleFormat::I16 => (16, hound::SampleFormat::Int),
    };
    hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample,
        sample_format,
    }
}

/// Renders to a WAV file instead of a sound card.
///
/// It offers a single device. Every opened stream starts the file over.
#[derive(Clone, Debug)]
pub struct WavBackend {
    path: PathBuf,
    rejected_formats: Vec<SampleFormat>,
}

impl WavBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_owned(),
            rejected_formats: vec![],
        }
    }

    /// Refuses to open streams in `format`.
    pub fn reject_format(mut self, format: SampleFormat) -> Self {
        self.rejected_formats.push(format);
        self
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn device(&self) -> OutputDevice {
        OutputDevice {
            id: format!("wav:{}", self.path.display()),
            name: self.path.display().to_string(),
            host: "WAV".to_owned(),
        }
    }
}

impl OutputBackend for WavBackend {
    type Stream = WavStream<BufWriter<File>>;

    fn output_devices(&self) -> Result<Vec<OutputDevice>, BackendError> {
        Ok(vec![self.device()])
    }

    fn default_output_device(&self) -> Result<Option<OutputDevice>, BackendError> {
        Ok(Some(self.device()))
    }

    fn open_stream(
        &self,
        device: &OutputDevice,
        config: &StreamConfig,
    ) -> Result<Self::Stream, BackendError> {
        if self.rejected_formats.contains(&config.format) {
            return Err(format!("{} samples not supported", config.format).into());
        }
        tracing::debug!(device = %device, ?config, "Creating wav file");
        let writer = hound::WavWriter::create(&self.path, wav_spec(config))?;
        Ok(WavStream::new(writer, config.format))
    }
}

#[derive(derive_more::Debug)]
pub struct WavStream<W>
where
    W: Write + Seek,
{
    #[debug(skip)]
    inner: Option<hound::WavWriter<W>>,
    format: SampleFormat,
}

impl<W> WavStream<W>
where
    W: Write + Seek,
{
    #[inline]
    pub fn new(inner: hound::WavWriter<W>, format: SampleFormat) -> Self {
        Self {
            inner: Some(inner),
            format,
        }
    }

    /// Writes the header and closes the file.
    pub fn finalize(&mut self) -> Result<(), Error> {
        if let Some(writer) = self.inner.take() {
            writer.finalize()?;
        }
        Ok(())
    }

    #[inline]
    fn writer_mut(&mut self) -> Result<&mut hound::WavWriter<W>, Error> {
        self.inner.as_mut().ok_or(Error::Closed)
    }

    fn write_samples(&mut self, samples: Samples<'_>) -> Result<(), Error> {
        if samples.format() != self.format {
            return Err(Error::FormatMismatch {
                expected: self.format,
                actual: samples.format(),
            });
        }

        let writer = self.writer_mut()?;
        match samples {
            Samples::F32(samples) => {
                for sample in samples {
                    writer.write_sample(*sample)?;
                }
            }
            Samples::I16(samples) => {
                for sample in samples {
                    writer.write_sample(*sample)?;
                }
            }
        }
        Ok(())
    }
}

impl<W> OutputStream for WavStream<W>
where
    W: Write + Seek + Send + 'static,
{
    fn write(&mut self, samples: Samples<'_>) -> Result<(), BackendError> {
        Ok(self.write_samples(samples)?)
    }

    fn play(&mut self, samples: Samples<'_>) -> Result<(), BackendError> {
        self.write_samples(samples)?;
        Ok(self.writer_mut()?.flush()?)
    }

    fn drain(&mut self) -> Result<(), BackendError> {
        Ok(self.writer_mut()?.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn config(format: SampleFormat) -> StreamConfig {
        StreamConfig {
            sample_rate: 8_000,
            channels: 1,
            format,
        }
    }

    #[test]
    fn writes_integer_samples() {
        let mut buffer = Cursor::new(vec![]);
        {
            let writer = hound::WavWriter::new(&mut buffer, wav_spec(&config(SampleFormat::I16))).unwrap();
            let mut stream = WavStream::new(writer, SampleFormat::I16);
            stream.write_samples(Samples::I16(&[1, -2, 3])).unwrap();
            stream.finalize().unwrap();
        }

        buffer.set_position(0);
        let mut reader = hound::WavReader::new(buffer).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![1, -2, 3]);
    }

    #[test]
    fn rejects_mismatched_samples() {
        let mut buffer = Cursor::new(vec![]);
        let writer = hound::WavWriter::new(&mut buffer, wav_spec(&config(SampleFormat::F32))).unwrap();
        let mut stream = WavStream::new(writer, SampleFormat::F32);

        assert!(matches!(
            stream.write_samples(Samples::I16(&[1])),
            Err(Error::FormatMismatch { .. })
        ));
    }

    #[test]
    fn backend_can_reject_formats() {
        let path = std::env::temp_dir().join("hellschreiber-wav-backend-reject.wav");
        let backend = WavBackend::new(&path).reject_format(SampleFormat::F32);
        let device = backend.device();

        assert!(backend.open_stream(&device, &config(SampleFormat::F32)).is_err());
        assert!(backend.open_stream(&device, &config(SampleFormat::I16)).is_ok());
        let _ = std::fs::remove_file(path);
    }
}
