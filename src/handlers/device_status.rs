use std::fmt;

use serde::Serialize;
use serde_with::SerializeDisplay;
use thiserror::Error;
use tracing::{debug, instrument};

/// Initialisation status reported on the device-status characteristic.
///
/// Decoding is total: codes outside `0x01..=0x0A` map to [`DeviceStatus::Unknown`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, SerializeDisplay)]
pub enum DeviceStatus {
    Initializing,
    WarmingUp,
    Ready,
    Error,
    CameraInit,
    MicrophoneInit,
    BleInit,
    BatteryNotDetected,
    Charging,
    BatteryUnstable,
    Unknown(u8),
}

impl DeviceStatus {
    /// Returns the raw status byte.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Initializing => 0x01,
            Self::WarmingUp => 0x02,
            Self::Ready => 0x03,
            Self::Error => 0x04,
            Self::CameraInit => 0x05,
            Self::MicrophoneInit => 0x06,
            Self::BleInit => 0x07,
            Self::BatteryNotDetected => 0x08,
            Self::Charging => 0x09,
            Self::BatteryUnstable => 0x0A,
            Self::Unknown(code) => code,
        }
    }

    /// Returns whether the device finished initialising.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns whether the status signals a fault.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(
            self,
            Self::Error | Self::BatteryNotDetected | Self::BatteryUnstable
        )
    }
}

impl From<u8> for DeviceStatus {
    fn from(code: u8) -> Self {
        match code {
            0x01 => Self::Initializing,
            0x02 => Self::WarmingUp,
            0x03 => Self::Ready,
            0x04 => Self::Error,
            0x05 => Self::CameraInit,
            0x06 => Self::MicrophoneInit,
            0x07 => Self::BleInit,
            0x08 => Self::BatteryNotDetected,
            0x09 => Self::Charging,
            0x0A => Self::BatteryUnstable,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "INITIALIZING",
            Self::WarmingUp => "WARMING_UP",
            Self::Ready => "READY",
            Self::Error => "ERROR",
            Self::CameraInit => "CAMERA_INIT",
            Self::MicrophoneInit => "MICROPHONE_INIT",
            Self::BleInit => "BLE_INIT",
            Self::BatteryNotDetected => "BATTERY_NOT_DETECTED",
            Self::Charging => "CHARGING",
            Self::BatteryUnstable => "BATTERY_UNSTABLE",
            Self::Unknown(code) => return write!(f, "UNKNOWN_{code:02X}"),
        };
        f.write_str(name)
    }
}

/// Latest reading held by a [`DeviceStatusTracker`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(tag = "reading", content = "status", rename_all = "snake_case")]
pub enum StatusReading {
    NoStatusYet,
    Status(DeviceStatus),
}

impl StatusReading {
    /// Returns the status, if one was received.
    #[must_use]
    pub const fn status(self) -> Option<DeviceStatus> {
        match self {
            Self::NoStatusYet => None,
            Self::Status(status) => Some(status),
        }
    }
}

/// Errors returned while decoding raw status notifications.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum DeviceStatusError {
    #[error("device status notification was empty")]
    TooShort,
}

/// Records every status notification in arrival order.
///
/// Any status may follow any other; the firmware gives no ordering guarantee,
/// so nothing here rejects a transition.
#[derive(Debug, Clone, Default)]
pub struct DeviceStatusTracker {
    history: Vec<DeviceStatus>,
}

impl DeviceStatusTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one status byte and appends it to the history.
    #[instrument(skip(self), level = "debug")]
    pub fn on_status_byte(&mut self, code: u8) -> DeviceStatus {
        let status = DeviceStatus::from(code);
        if let Some(previous) = self.history.last()
            && *previous != status
        {
            debug!(%previous, %status, "device status changed");
        }
        self.history.push(status);
        status
    }

    /// Decodes a raw status notification using its first byte.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceStatusError::TooShort`] for an empty payload; the
    /// history is left untouched.
    pub fn on_status_payload(&mut self, payload: &[u8]) -> Result<DeviceStatus, DeviceStatusError> {
        let code = payload.first().copied().ok_or(DeviceStatusError::TooShort)?;
        Ok(self.on_status_byte(code))
    }

    /// Returns the most recent reading.
    #[must_use]
    pub fn current(&self) -> StatusReading {
        self.history
            .last()
            .copied()
            .map_or(StatusReading::NoStatusYet, StatusReading::Status)
    }

    /// Returns every status in arrival order.
    #[must_use]
    pub fn history(&self) -> &[DeviceStatus] {
        &self.history
    }

    /// Returns consecutive `(from, to)` pairs over the history.
    pub fn transitions(&self) -> impl Iterator<Item = (DeviceStatus, DeviceStatus)> + '_ {
        self.history.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0x01, DeviceStatus::Initializing)]
    #[case(0x03, DeviceStatus::Ready)]
    #[case(0x05, DeviceStatus::CameraInit)]
    #[case(0x0A, DeviceStatus::BatteryUnstable)]
    #[case(0x00, DeviceStatus::Unknown(0x00))]
    #[case(0x0B, DeviceStatus::Unknown(0x0B))]
    #[case(0xFF, DeviceStatus::Unknown(0xFF))]
    fn decodes_status_codes(#[case] code: u8, #[case] expected: DeviceStatus) {
        assert_eq!(expected, DeviceStatus::from(code));
    }

    #[test]
    fn decode_is_total_and_code_round_trips() {
        for code in u8::MIN..=u8::MAX {
            assert_eq!(code, DeviceStatus::from(code).code());
        }
    }

    #[rstest]
    #[case(DeviceStatus::WarmingUp, "WARMING_UP")]
    #[case(DeviceStatus::BatteryNotDetected, "BATTERY_NOT_DETECTED")]
    #[case(DeviceStatus::Unknown(0x2A), "UNKNOWN_2A")]
    fn displays_firmware_names(#[case] status: DeviceStatus, #[case] expected: &str) {
        assert_eq!(expected, status.to_string());
    }

    #[test]
    fn classifies_error_statuses() {
        let errors: Vec<_> = (u8::MIN..=u8::MAX)
            .map(DeviceStatus::from)
            .filter(|status| status.is_error())
            .collect();
        assert_eq!(
            vec![
                DeviceStatus::Error,
                DeviceStatus::BatteryNotDetected,
                DeviceStatus::BatteryUnstable
            ],
            errors
        );
        assert!(DeviceStatus::Ready.is_ready());
        assert!(!DeviceStatus::Ready.is_error());
    }

    #[test]
    fn current_reports_no_status_before_first_notification() {
        let tracker = DeviceStatusTracker::new();
        assert_eq!(StatusReading::NoStatusYet, tracker.current());
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn history_records_every_notification_including_repeats() {
        let mut tracker = DeviceStatusTracker::new();
        for code in [0x01, 0x05, 0x05, 0x04, 0x63] {
            tracker.on_status_byte(code);
        }

        assert_eq!(
            &[
                DeviceStatus::Initializing,
                DeviceStatus::CameraInit,
                DeviceStatus::CameraInit,
                DeviceStatus::Error,
                DeviceStatus::Unknown(0x63),
            ],
            tracker.history()
        );
        assert_eq!(
            StatusReading::Status(DeviceStatus::Unknown(0x63)),
            tracker.current()
        );
    }

    #[test]
    fn transitions_pair_consecutive_statuses() {
        let mut tracker = DeviceStatusTracker::new();
        tracker.on_status_byte(0x05);
        tracker.on_status_byte(0x03);
        tracker.on_status_byte(0x05);

        let transitions: Vec<_> = tracker.transitions().collect();
        assert_eq!(
            vec![
                (DeviceStatus::CameraInit, DeviceStatus::Ready),
                (DeviceStatus::Ready, DeviceStatus::CameraInit),
            ],
            transitions
        );
    }

    #[test]
    fn empty_payload_is_rejected_without_recording() {
        let mut tracker = DeviceStatusTracker::new();
        assert_matches!(
            tracker.on_status_payload(&[]),
            Err(DeviceStatusError::TooShort)
        );
        assert!(tracker.history().is_empty());

        let status = tracker
            .on_status_payload(&[0x03, 0xEE])
            .expect("non-empty payload should decode");
        assert_eq!(DeviceStatus::Ready, status);
    }

    #[test]
    fn serializes_as_display_name() {
        let json = serde_json::to_string(&StatusReading::Status(DeviceStatus::Charging))
            .expect("status reading should serialize");
        insta::assert_snapshot!(json, @r#"{"reading":"status","status":"CHARGING"}"#);
    }
}
