use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::handlers::ChannelKind;

/// Advertised local-name prefix of OpenGlass peripherals.
pub(crate) const DEVICE_NAME_PREFIX: &str = "OpenGlass";

/// Known OpenGlass GATT endpoints.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, EnumIter, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointId {
    /// Primary OpenGlass service.
    #[strum(to_string = "main_service")]
    MainService,
    /// PCM/Opus audio chunks.
    #[strum(to_string = "audio_data")]
    AudioData,
    /// Active audio codec id.
    #[strum(to_string = "audio_codec")]
    AudioCodec,
    /// Chunked photo transfer.
    #[strum(to_string = "photo_data")]
    PhotoData,
    /// Photo capture commands.
    #[strum(to_string = "photo_control")]
    PhotoControl,
    /// Device initialisation status.
    #[strum(to_string = "device_status")]
    DeviceStatus,
    /// Chunked video frame transfer.
    #[strum(to_string = "video_data")]
    VideoData,
    /// Video streaming commands.
    #[strum(to_string = "video_control")]
    VideoControl,
    /// Video streaming counters.
    #[strum(to_string = "video_status")]
    VideoStatus,
    /// Hotspot commands.
    #[strum(to_string = "hotspot_control")]
    HotspotControl,
    /// Hotspot status snapshots.
    #[strum(to_string = "hotspot_status")]
    HotspotStatus,
}

impl EndpointId {
    /// Returns the framed channel carried by a data endpoint.
    ///
    /// ```
    /// use openglass::{ChannelKind, EndpointId};
    ///
    /// assert_eq!(Some(ChannelKind::Photo), EndpointId::PhotoData.channel_kind());
    /// assert_eq!(None, EndpointId::DeviceStatus.channel_kind());
    /// ```
    #[must_use]
    pub const fn channel_kind(self) -> Option<ChannelKind> {
        match self {
            Self::PhotoData => Some(ChannelKind::Photo),
            Self::VideoData => Some(ChannelKind::Video),
            Self::AudioData => Some(ChannelKind::Audio),
            _ => None,
        }
    }

    /// Returns the endpoint UUID.
    #[must_use]
    pub fn uuid(self) -> &'static str {
        endpoint_metadata(self).uuid()
    }
}

/// Endpoint category in GATT.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub(crate) enum EndpointKind {
    /// GATT service endpoint.
    #[strum(to_string = "service")]
    Service,
    /// GATT characteristic endpoint.
    #[strum(to_string = "characteristic")]
    Characteristic,
}

/// Descriptive metadata for one protocol endpoint.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct EndpointMetadata {
    name: &'static str,
    uuid: &'static str,
    kind: EndpointKind,
}

impl EndpointMetadata {
    /// Human-readable endpoint name.
    pub(crate) fn name(self) -> &'static str {
        self.name
    }

    /// Endpoint UUID in upper case, as the firmware declares it.
    pub(crate) fn uuid(self) -> &'static str {
        self.uuid
    }

    /// Endpoint kind.
    pub(crate) fn kind(self) -> EndpointKind {
        self.kind
    }
}

/// Endpoint metadata keyed by typed endpoint IDs.
static ENDPOINTS_BY_ID: LazyLock<HashMap<EndpointId, EndpointMetadata>> = LazyLock::new(|| {
    EndpointId::iter()
        .map(|endpoint| (endpoint, metadata_for(endpoint)))
        .collect()
});

/// Returns metadata for one endpoint.
pub(crate) fn endpoint_metadata(endpoint: EndpointId) -> EndpointMetadata {
    ENDPOINTS_BY_ID
        .get(&endpoint)
        .copied()
        .unwrap_or_else(|| metadata_for(endpoint))
}

/// Returns all known endpoints.
pub(crate) fn known_endpoints() -> impl Iterator<Item = EndpointId> {
    EndpointId::iter()
}

/// Creates a presence map initialised with all known endpoints set to `false`.
pub(crate) fn empty_presence_map() -> HashMap<EndpointId, bool> {
    known_endpoints()
        .map(|endpoint| (endpoint, false))
        .collect()
}

/// Maps a service or characteristic UUID back to its endpoint, ignoring case.
///
/// ```
/// use openglass::{EndpointId, endpoint_for_uuid};
///
/// assert_eq!(
///     Some(EndpointId::PhotoData),
///     endpoint_for_uuid("19b10005-e8f2-537e-4f6c-d104768a1214"),
/// );
/// ```
#[must_use]
pub fn endpoint_for_uuid(uuid: &str) -> Option<EndpointId> {
    known_endpoints().find(|endpoint| endpoint_metadata(*endpoint).uuid().eq_ignore_ascii_case(uuid))
}

fn metadata_for(endpoint: EndpointId) -> EndpointMetadata {
    let (name, uuid, kind) = match endpoint {
        EndpointId::MainService => (
            "OpenGlass service",
            "19B10000-E8F2-537E-4F6C-D104768A1214",
            EndpointKind::Service,
        ),
        EndpointId::AudioData => (
            "audio data",
            "19B10001-E8F2-537E-4F6C-D104768A1214",
            EndpointKind::Characteristic,
        ),
        EndpointId::AudioCodec => (
            "audio codec",
            "19B10002-E8F2-537E-4F6C-D104768A1214",
            EndpointKind::Characteristic,
        ),
        EndpointId::PhotoData => (
            "photo data",
            "19B10005-E8F2-537E-4F6C-D104768A1214",
            EndpointKind::Characteristic,
        ),
        EndpointId::PhotoControl => (
            "photo control",
            "19B10006-E8F2-537E-4F6C-D104768A1214",
            EndpointKind::Characteristic,
        ),
        EndpointId::DeviceStatus => (
            "device status",
            "19B10007-E8F2-537E-4F6C-D104768A1214",
            EndpointKind::Characteristic,
        ),
        EndpointId::VideoData => (
            "video data",
            "19B10008-E8F2-537E-4F6C-D104768A1214",
            EndpointKind::Characteristic,
        ),
        EndpointId::VideoControl => (
            "video control",
            "19B10009-E8F2-537E-4F6C-D104768A1214",
            EndpointKind::Characteristic,
        ),
        EndpointId::VideoStatus => (
            "video status",
            "19B1000A-E8F2-537E-4F6C-D104768A1214",
            EndpointKind::Characteristic,
        ),
        EndpointId::HotspotControl => (
            "hotspot control",
            "19B1000B-E8F2-537E-4F6C-D104768A1214",
            EndpointKind::Characteristic,
        ),
        EndpointId::HotspotStatus => (
            "hotspot status",
            "19B1000C-E8F2-537E-4F6C-D104768A1214",
            EndpointKind::Characteristic,
        ),
    };

    EndpointMetadata { name, uuid, kind }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn every_endpoint_uuid_maps_back_to_itself() {
        for endpoint in known_endpoints() {
            let uuid = endpoint_metadata(endpoint).uuid();
            assert_eq!(Some(endpoint), endpoint_for_uuid(uuid));
            assert_eq!(Some(endpoint), endpoint_for_uuid(&uuid.to_ascii_lowercase()));
        }
    }

    #[test]
    fn unknown_uuid_is_unmapped() {
        assert_eq!(None, endpoint_for_uuid("0000fa03-0000-1000-8000-00805f9b34fb"));
    }

    #[rstest]
    #[case(EndpointId::MainService, EndpointKind::Service)]
    #[case(EndpointId::HotspotStatus, EndpointKind::Characteristic)]
    fn endpoint_kinds(#[case] endpoint: EndpointId, #[case] expected: EndpointKind) {
        assert_eq!(expected, endpoint_metadata(endpoint).kind());
    }

    #[test]
    fn data_endpoints_map_to_channels() {
        let framed: Vec<_> = known_endpoints()
            .filter_map(|endpoint| endpoint.channel_kind().map(|channel| (endpoint, channel)))
            .collect();
        assert_eq!(
            vec![
                (EndpointId::AudioData, ChannelKind::Audio),
                (EndpointId::PhotoData, ChannelKind::Photo),
                (EndpointId::VideoData, ChannelKind::Video),
            ],
            framed
        );
    }
}
