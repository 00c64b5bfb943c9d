use std::ops::RangeInclusive;

use serde::Serialize;
use strum_macros::{Display, EnumIter};
use thiserror::Error;

/// Photo intervals the firmware accepts; the value travels as a signed byte.
pub const PHOTO_INTERVAL_SECS: RangeInclusive<u16> = 5..=127;
/// Streaming rates accepted by [`VideoControl::fps`].
pub const VIDEO_FPS: RangeInclusive<u8> = 2..=10;

/// Errors returned when building control writes.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ControlError {
    #[error("photo interval {secs}s is outside the supported 5..=127 second range")]
    IntervalOutOfRange { secs: u16 },
    #[error("video rate {fps} fps is outside the supported 2..=10 range")]
    FpsOutOfRange { fps: u8 },
}

/// Single-byte writes to the photo-control characteristic.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoControl {
    /// Capture one photo (`-1` as a signed byte).
    SingleShot,
    /// Stop interval capture.
    Stop,
    /// Capture every `n` seconds.
    Interval(u8),
}

impl PhotoControl {
    /// Builds an interval capture command.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::IntervalOutOfRange`] outside 5..=127 seconds.
    pub fn interval(secs: u16) -> Result<Self, ControlError> {
        if !PHOTO_INTERVAL_SECS.contains(&secs) {
            return Err(ControlError::IntervalOutOfRange { secs });
        }
        u8::try_from(secs)
            .map(Self::Interval)
            .map_err(|_| ControlError::IntervalOutOfRange { secs })
    }

    /// Encodes the write payload.
    #[must_use]
    pub const fn encode(self) -> [u8; 1] {
        match self {
            Self::SingleShot => [0xFF],
            Self::Stop => [0x00],
            Self::Interval(secs) => [secs],
        }
    }
}

/// Single-byte writes to the video-control characteristic.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoControl {
    Start,
    Stop,
    /// Start streaming at `n` frames per second.
    Fps(u8),
}

impl VideoControl {
    /// Builds a start command at an explicit frame rate.
    ///
    /// One frame per second is [`VideoControl::Start`] on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::FpsOutOfRange`] outside 2..=10.
    pub fn fps(fps: u8) -> Result<Self, ControlError> {
        if VIDEO_FPS.contains(&fps) {
            Ok(Self::Fps(fps))
        } else {
            Err(ControlError::FpsOutOfRange { fps })
        }
    }

    /// Encodes the write payload.
    #[must_use]
    pub const fn encode(self) -> [u8; 1] {
        match self {
            Self::Start => [0x01],
            Self::Stop => [0x00],
            Self::Fps(fps) => [fps],
        }
    }
}

/// Commands written to the hotspot-control characteristic.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HotspotCommand {
    #[strum(to_string = "stop")]
    Stop,
    #[strum(to_string = "start")]
    Start,
    #[strum(to_string = "toggle")]
    Toggle,
    #[strum(to_string = "get_status")]
    GetStatus,
}

impl HotspotCommand {
    /// Encodes the write payload.
    #[must_use]
    pub const fn encode(self) -> [u8; 1] {
        match self {
            Self::Stop => [0x00],
            Self::Start => [0x01],
            Self::Toggle => [0x02],
            Self::GetStatus => [0x03],
        }
    }
}
