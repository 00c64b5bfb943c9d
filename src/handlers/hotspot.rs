use std::fmt;

use serde::Serialize;
use serde_with::SerializeDisplay;
use strum_macros::Display;
use thiserror::Error;
use tracing::{debug, instrument};

const FIXED_LEN: usize = 3;
const COUNTERS_LEN: usize = 8;

/// Errors returned by [`HotspotStatus::decode`].
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum HotspotDecodeError {
    #[error("hotspot status is too short: expected at least 3 bytes, got {actual}")]
    TooShort { actual: usize },
}

/// Hotspot lifecycle state carried in the status code byte.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, SerializeDisplay)]
pub enum HotspotState {
    Disabled,
    Starting,
    Active,
    Error,
    Unknown(u8),
}

impl From<u8> for HotspotState {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Disabled,
            1 => Self::Starting,
            2 => Self::Active,
            3 => Self::Error,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for HotspotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Starting => f.write_str("starting"),
            Self::Active => f.write_str("active"),
            Self::Error => f.write_str("error"),
            Self::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}

/// Bitmask of transports the hotspot is serving.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct ActiveInterfaces(u8);

impl ActiveInterfaces {
    const BLE: u8 = 0b01;
    const WIFI: u8 = 0b10;

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn ble(self) -> bool {
        self.0 & Self::BLE != 0
    }

    #[must_use]
    pub const fn wifi(self) -> bool {
        self.0 & Self::WIFI != 0
    }
}

impl fmt::Display for ActiveInterfaces {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ble(), self.wifi()) {
            (true, true) => f.write_str("ble+wifi"),
            (true, false) => f.write_str("ble"),
            (false, true) => f.write_str("wifi"),
            (false, false) => f.write_str("none"),
        }
    }
}

/// Length-prefixed string fields of a hotspot record.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HotspotField {
    #[strum(to_string = "ssid")]
    Ssid,
    #[strum(to_string = "ip_address")]
    IpAddress,
}

/// The first string field whose declared length ran past the record.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct TruncatedField {
    pub field: HotspotField,
    pub declared_len: usize,
    pub available: usize,
}

/// Point-in-time hotspot snapshot.
///
/// Everything after `max_clients` is optional; `None` means the firmware did
/// not send the field, never that it sent zero.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct HotspotStatus {
    pub status_code: u8,
    pub connected_clients: u8,
    pub max_clients: u8,
    pub ble_connected: Option<bool>,
    pub active_interfaces: Option<ActiveInterfaces>,
    pub total_data_bytes: Option<u32>,
    pub ble_data_bytes: Option<u32>,
    pub ssid: Option<String>,
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncated: Option<TruncatedField>,
}

impl HotspotStatus {
    /// Decodes one hotspot status notification.
    ///
    /// Optional fields are read only while bytes remain. A string whose
    /// length prefix overruns the record is left absent along with every
    /// field after it, and reported through [`HotspotStatus::truncated`].
    ///
    /// # Errors
    ///
    /// Returns [`HotspotDecodeError::TooShort`] when fewer than three bytes are
    /// present.
    ///
    /// ```
    /// use openglass::{HotspotState, HotspotStatus};
    ///
    /// let status = HotspotStatus::decode(&[0x02, 0x01, 0x04])?;
    /// assert_eq!(HotspotState::Active, status.state());
    /// assert_eq!(None, status.ble_connected);
    /// # Ok::<(), openglass::HotspotDecodeError>(())
    /// ```
    #[instrument(skip(raw), level = "trace", fields(raw_len = raw.len()))]
    pub fn decode(raw: &[u8]) -> Result<Self, HotspotDecodeError> {
        let Some((fixed, rest)) = raw.split_first_chunk::<FIXED_LEN>() else {
            return Err(HotspotDecodeError::TooShort { actual: raw.len() });
        };
        let [status_code, connected_clients, max_clients] = *fixed;

        let mut reader = ByteReader::new(rest);
        let ble_connected = reader.u8().map(|value| value != 0);
        let active_interfaces = reader.u8().map(ActiveInterfaces::from_bits);
        let (total_data_bytes, ble_data_bytes) = if reader.remaining() >= COUNTERS_LEN {
            (reader.u32_le(), reader.u32_le())
        } else {
            (None, None)
        };

        let mut truncated = None;
        let ssid = reader
            .length_prefixed_string(HotspotField::Ssid)
            .unwrap_or_else(|field| {
                truncated = Some(field);
                None
            });
        let ip_address = if truncated.is_none() {
            reader
                .length_prefixed_string(HotspotField::IpAddress)
                .unwrap_or_else(|field| {
                    truncated = Some(field);
                    None
                })
        } else {
            None
        };

        if let Some(field) = truncated {
            debug!(
                field = %field.field,
                declared_len = field.declared_len,
                available = field.available,
                "hotspot status string truncated"
            );
        }

        Ok(Self {
            status_code,
            connected_clients,
            max_clients,
            ble_connected,
            active_interfaces,
            total_data_bytes,
            ble_data_bytes,
            ssid,
            ip_address,
            truncated,
        })
    }

    /// Returns the decoded hotspot state.
    #[must_use]
    pub fn state(&self) -> HotspotState {
        HotspotState::from(self.status_code)
    }

    /// Returns the first string field that could not be fully read.
    #[must_use]
    pub fn truncated(&self) -> Option<TruncatedField> {
        self.truncated
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(len)?;
        let slice = self.bytes.get(self.offset..end)?;
        self.offset = end;
        Some(slice)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|bytes| bytes[0])
    }

    fn u32_le(&mut self) -> Option<u32> {
        let bytes = self.take(4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads `[len, bytes..]`; a missing or zero length leaves the field absent.
    fn length_prefixed_string(
        &mut self,
        field: HotspotField,
    ) -> Result<Option<String>, TruncatedField> {
        let Some(declared_len) = self.u8().map(usize::from) else {
            return Ok(None);
        };
        if declared_len == 0 {
            return Ok(None);
        }

        let available = self.remaining();
        self.take(declared_len)
            .map(|bytes| Some(String::from_utf8_lossy(bytes).into_owned()))
            .ok_or(TruncatedField {
                field,
                declared_len,
                available,
            })
    }
}
