use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

const RECORD_LEN: usize = 6;

/// Errors returned by [`VideoStatus::decode`].
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum VideoStatusError {
    #[error("video status is too short: expected 6 bytes, got {actual}")]
    TooShort { actual: usize },
}

/// Streaming counters reported on the video-status characteristic.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct VideoStatus {
    pub streaming: bool,
    pub fps: u8,
    pub frame_count: u16,
    pub dropped_frames: u16,
}

impl VideoStatus {
    /// Decodes `[streaming, fps, frame_count: u16le, dropped_frames: u16le]`.
    ///
    /// Trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`VideoStatusError::TooShort`] for records under six bytes.
    #[instrument(skip(raw), level = "trace", fields(raw_len = raw.len()))]
    pub fn decode(raw: &[u8]) -> Result<Self, VideoStatusError> {
        let Some(record) = raw.first_chunk::<RECORD_LEN>() else {
            return Err(VideoStatusError::TooShort { actual: raw.len() });
        };
        let [streaming, fps, frames_lo, frames_hi, dropped_lo, dropped_hi] = *record;

        Ok(Self {
            streaming: streaming != 0,
            fps,
            frame_count: u16::from_le_bytes([frames_lo, frames_hi]),
            dropped_frames: u16::from_le_bytes([dropped_lo, dropped_hi]),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decodes_status_record() {
        let status = VideoStatus::decode(&[0x01, 0x05, 0x2C, 0x01, 0x03, 0x00, 0xEE])
            .expect("six-byte record should decode");
        assert_eq!(
            VideoStatus {
                streaming: true,
                fps: 5,
                frame_count: 300,
                dropped_frames: 3,
            },
            status
        );
    }

    #[test]
    fn rejects_short_record() {
        assert_matches!(
            VideoStatus::decode(&[0x00, 0x05, 0x00, 0x00, 0x00]),
            Err(VideoStatusError::TooShort { actual: 5 })
        );
    }
}
