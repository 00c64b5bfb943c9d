use std::fmt;
use std::time::Duration;

use bon::Builder;
use serde::Serialize;
use serde_with::SerializeDisplay;
use thiserror::Error;
use tracing::{debug, instrument, trace};

const DEFAULT_HEADER_LEN: usize = 3;
const DEFAULT_TARGET_AMPLITUDE: f64 = 16_000.0;
const DEFAULT_SAMPLE_RATE_HZ: u32 = 16_000;
const SAMPLE_WIDTH: usize = 2;

/// Codec advertised on the audio-codec characteristic.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, SerializeDisplay)]
pub enum AudioCodec {
    Pcm,
    MuLaw,
    Opus,
    Unknown(u8),
}

impl AudioCodec {
    /// Decodes the codec characteristic value; the first byte is the codec id.
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        payload.first().copied().map(Self::from)
    }

    /// Returns whether chunks carry raw 16-bit PCM.
    #[must_use]
    pub const fn is_pcm(self) -> bool {
        matches!(self, Self::Pcm)
    }
}

impl From<u8> for AudioCodec {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Pcm,
            11 => Self::MuLaw,
            20 => Self::Opus,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pcm => f.write_str("pcm"),
            Self::MuLaw => f.write_str("mulaw"),
            Self::Opus => f.write_str("opus"),
            Self::Unknown(id) => write!(f, "unknown({id})"),
        }
    }
}

/// Errors returned when interpreting accumulated audio.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum AudioError {
    #[error("accumulated audio is {total_bytes} bytes, not a whole number of 16-bit samples")]
    OddByteLength { total_bytes: usize },
}

/// Accumulator and normalisation settings.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct AudioConfig {
    /// Bytes stripped from the front of every chunk.
    #[builder(default = DEFAULT_HEADER_LEN)]
    header_len: usize,
    /// Peak amplitude after normalisation.
    #[builder(default = DEFAULT_TARGET_AMPLITUDE)]
    target_amplitude: f64,
    #[builder(default = DEFAULT_SAMPLE_RATE_HZ)]
    sample_rate_hz: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AudioConfig {
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    #[must_use]
    pub fn target_amplitude(&self) -> f64 {
        self.target_amplitude
    }

    #[must_use]
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }
}

/// Summary statistics over the raw, unprocessed sample stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioStats {
    pub sample_count: usize,
    pub min: Option<i16>,
    pub max: Option<i16>,
    pub mean: f64,
    pub peak: u16,
    pub rms: f64,
    pub duration_secs: f64,
}

/// Normalised samples produced by [`AudioAccumulator::finalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<i16>,
    dc_offset: f64,
    scale: Option<f64>,
    sample_rate_hz: u32,
}

impl SampleBuffer {
    /// Returns the processed samples.
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Returns the mean that was subtracted from the raw samples.
    #[must_use]
    pub fn dc_offset(&self) -> f64 {
        self.dc_offset
    }

    /// Returns the gain applied after centering, or `None` for silence.
    #[must_use]
    pub fn scale(&self) -> Option<f64> {
        self.scale
    }

    #[must_use]
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Returns the playback duration at the configured sample rate.
    #[must_use]
    pub fn duration(&self) -> Duration {
        duration_of(self.samples.len(), self.sample_rate_hz)
    }

    /// Encodes the samples as mono 16-bit little-endian PCM.
    #[must_use]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples
            .iter()
            .flat_map(|sample| sample.to_le_bytes())
            .collect()
    }
}

/// Accumulates PCM chunks from the audio data characteristic.
///
/// Raw chunks are kept as received so [`finalize`](Self::finalize) and
/// [`stats`](Self::stats) can run any number of times.
#[derive(Debug, Clone, Default)]
pub struct AudioAccumulator {
    config: AudioConfig,
    chunks: Vec<Vec<u8>>,
    total_bytes: usize,
    dropped_chunks: usize,
}

impl AudioAccumulator {
    /// Creates an accumulator with the given settings.
    #[must_use]
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Strips the chunk header and stores the remaining sample bytes.
    ///
    /// Chunks no longer than the header carry no samples and are counted as
    /// dropped. Returns the accumulated byte count.
    #[instrument(skip(self, raw), level = "trace", fields(raw_len = raw.len()))]
    pub fn append_chunk(&mut self, raw: &[u8]) -> usize {
        match raw.get(self.config.header_len..) {
            Some(samples) if !samples.is_empty() => {
                self.total_bytes += samples.len();
                self.chunks.push(samples.to_vec());
                trace!(total_bytes = self.total_bytes, "audio chunk appended");
            }
            _ => {
                self.dropped_chunks += 1;
                debug!(
                    raw_len = raw.len(),
                    header_len = self.config.header_len,
                    "audio chunk carries no samples, dropping"
                );
            }
        }
        self.total_bytes
    }

    /// Returns the number of stored chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the number of sample bytes stored.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Returns the number of chunks discarded for carrying no samples.
    #[must_use]
    pub fn dropped_chunks(&self) -> usize {
        self.dropped_chunks
    }

    /// Discards all stored chunks.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
        self.dropped_chunks = 0;
    }

    /// Computes statistics over the raw samples.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::OddByteLength`] when the stored bytes do not form
    /// whole samples.
    pub fn stats(&self) -> Result<AudioStats, AudioError> {
        let samples = self.raw_samples()?;
        let sample_count = samples.len();
        let (mean, rms) = if samples.is_empty() {
            (0.0, 0.0)
        } else {
            let count = sample_count as f64;
            let sum: f64 = samples.iter().copied().map(f64::from).sum();
            let squares: f64 = samples
                .iter()
                .copied()
                .map(|sample| f64::from(sample).powi(2))
                .sum();
            (sum / count, (squares / count).sqrt())
        };

        Ok(AudioStats {
            sample_count,
            min: samples.iter().copied().min(),
            max: samples.iter().copied().max(),
            mean,
            peak: samples
                .iter()
                .map(|sample| sample.unsigned_abs())
                .max()
                .unwrap_or(0),
            rms,
            duration_secs: seconds_of(sample_count, self.config.sample_rate_hz),
        })
    }

    /// Removes the DC offset and normalises the peak to the target amplitude.
    ///
    /// Silence (zero peak after centering) is returned unscaled. Results are
    /// clamped to the `i16` range and truncated toward zero.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::OddByteLength`] when the stored bytes do not form
    /// whole samples.
    ///
    /// ```
    /// use openglass::{AudioAccumulator, AudioConfig};
    ///
    /// let mut audio = AudioAccumulator::new(AudioConfig::default());
    /// audio.append_chunk(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x64, 0x00]);
    /// let buffer = audio.finalize()?;
    /// assert_eq!(&[-16000, 16000], buffer.samples());
    /// # Ok::<(), openglass::AudioError>(())
    /// ```
    #[instrument(skip(self), level = "debug", fields(total_bytes = self.total_bytes))]
    pub fn finalize(&self) -> Result<SampleBuffer, AudioError> {
        let raw = self.raw_samples()?;
        if raw.is_empty() {
            return Ok(SampleBuffer {
                samples: Vec::new(),
                dc_offset: 0.0,
                scale: None,
                sample_rate_hz: self.config.sample_rate_hz,
            });
        }

        let dc_offset = raw.iter().copied().map(f64::from).sum::<f64>() / raw.len() as f64;
        let centered: Vec<f64> = raw
            .iter()
            .map(|sample| f64::from(*sample) - dc_offset)
            .collect();
        let peak = centered
            .iter()
            .fold(0.0_f64, |peak, sample| peak.max(sample.abs()));
        let scale = (peak > 0.0).then(|| self.config.target_amplitude / peak);

        let samples = centered
            .iter()
            .map(|sample| quantize(sample * scale.unwrap_or(1.0)))
            .collect();
        debug!(dc_offset, peak, ?scale, "audio normalised");

        Ok(SampleBuffer {
            samples,
            dc_offset,
            scale,
            sample_rate_hz: self.config.sample_rate_hz,
        })
    }

    fn raw_samples(&self) -> Result<Vec<i16>, AudioError> {
        if self.total_bytes % SAMPLE_WIDTH != 0 {
            return Err(AudioError::OddByteLength {
                total_bytes: self.total_bytes,
            });
        }

        // Chunks may split a sample across their boundary.
        let bytes: Vec<u8> = self.chunks.concat();
        Ok(bytes
            .chunks_exact(SAMPLE_WIDTH)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }
}

fn quantize(value: f64) -> i16 {
    value.clamp(f64::from(i16::MIN), f64::from(i16::MAX)).trunc() as i16
}

fn seconds_of(sample_count: usize, sample_rate_hz: u32) -> f64 {
    if sample_rate_hz == 0 {
        return 0.0;
    }
    sample_count as f64 / f64::from(sample_rate_hz)
}

fn duration_of(sample_count: usize, sample_rate_hz: u32) -> Duration {
    Duration::from_secs_f64(seconds_of(sample_count, sample_rate_hz))
}
