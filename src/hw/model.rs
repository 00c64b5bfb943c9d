use std::collections::{BTreeMap, HashMap};

use bon::Builder;
use serde::Serialize;

use crate::protocol::{self, EndpointId};

/// A discovered BLE peripheral that matched a scan predicate.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FoundDevice {
    adapter_name: String,
    device_id: String,
    local_name: Option<String>,
    rssi: Option<i16>,
}

impl FoundDevice {
    /// Creates a new discovered-device record.
    pub(crate) fn new(
        adapter_name: String,
        device_id: String,
        local_name: Option<String>,
        rssi: Option<i16>,
    ) -> Self {
        Self {
            adapter_name,
            device_id,
            local_name,
            rssi,
        }
    }

    /// Returns the adapter name used to discover this device.
    #[must_use]
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Returns the backend-specific device identifier.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the advertised local name, if present.
    #[must_use]
    pub fn local_name(&self) -> Option<&str> {
        self.local_name.as_deref()
    }

    /// Returns the latest observed RSSI value, if present.
    #[must_use]
    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }

    /// Returns whether the local name starts with a prefix.
    pub(crate) fn local_name_starts_with(&self, prefix: &str) -> bool {
        self.local_name
            .as_deref()
            .is_some_and(|name| name.starts_with(prefix))
    }
}

/// A characteristic description discovered on a connected peripheral.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct CharacteristicInfo {
    uuid: String,
    properties: Vec<String>,
}

impl CharacteristicInfo {
    /// Creates a characteristic description.
    pub(crate) fn new(uuid: String, properties: Vec<String>) -> Self {
        Self { uuid, properties }
    }

    /// Returns the characteristic UUID.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Returns property labels for this characteristic.
    #[must_use]
    pub fn properties(&self) -> &[String] {
        &self.properties
    }
}

/// A GATT service with discovered characteristics.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ServiceInfo {
    uuid: String,
    primary: bool,
    characteristics: Vec<CharacteristicInfo>,
}

impl ServiceInfo {
    /// Creates a service description.
    pub(crate) fn new(
        uuid: String,
        primary: bool,
        characteristics: Vec<CharacteristicInfo>,
    ) -> Self {
        Self {
            uuid,
            primary,
            characteristics,
        }
    }

    /// Returns the service UUID.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Returns whether this is a primary service.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Returns all characteristics in this service.
    #[must_use]
    pub fn characteristics(&self) -> &[CharacteristicInfo] {
        &self.characteristics
    }
}

/// Presence flags for the OpenGlass endpoints on a connected device.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EndpointPresence {
    by_endpoint: BTreeMap<EndpointId, bool>,
}

impl EndpointPresence {
    /// Creates endpoint-presence flags.
    pub(crate) fn new(by_endpoint: HashMap<EndpointId, bool>) -> Self {
        Self {
            by_endpoint: by_endpoint.into_iter().collect(),
        }
    }

    /// Derives presence flags from discovered services.
    pub(crate) fn from_services(services: &[ServiceInfo]) -> Self {
        let mut by_endpoint = protocol::empty_presence_map();
        let uuids = services.iter().flat_map(|service| {
            std::iter::once(service.uuid()).chain(
                service
                    .characteristics()
                    .iter()
                    .map(CharacteristicInfo::uuid),
            )
        });
        for uuid in uuids {
            if let Some(endpoint) = protocol::endpoint_for_uuid(uuid) {
                by_endpoint.insert(endpoint, true);
            }
        }
        Self::new(by_endpoint)
    }

    /// Returns whether an endpoint is present on the connected device.
    #[must_use]
    pub fn is_present(&self, endpoint: EndpointId) -> bool {
        self.by_endpoint.get(&endpoint).copied().unwrap_or(false)
    }

    /// Returns endpoints that are not present, in catalogue order.
    #[must_use]
    pub fn missing(&self) -> Vec<EndpointId> {
        self.by_endpoint
            .iter()
            .filter(|(_, present)| !**present)
            .map(|(endpoint, _)| *endpoint)
            .collect()
    }
}

/// Result of the `inspect` command.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct InspectReport {
    device: FoundDevice,
    services: Vec<ServiceInfo>,
    endpoint_presence: EndpointPresence,
}

impl InspectReport {
    /// Creates an inspect report.
    pub(crate) fn new(
        device: FoundDevice,
        services: Vec<ServiceInfo>,
        endpoint_presence: EndpointPresence,
    ) -> Self {
        Self {
            device,
            services,
            endpoint_presence,
        }
    }

    /// Returns the connected device details.
    #[must_use]
    pub fn device(&self) -> &FoundDevice {
        &self.device
    }

    /// Returns discovered services.
    #[must_use]
    pub fn services(&self) -> &[ServiceInfo] {
        &self.services
    }

    /// Returns OpenGlass endpoint presence.
    #[must_use]
    pub fn endpoint_presence(&self) -> &EndpointPresence {
        &self.endpoint_presence
    }
}

/// A characteristic write issued once the notification stream is open.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WriteRequest {
    pub endpoint: EndpointId,
    pub payload: Vec<u8>,
}

impl WriteRequest {
    /// Creates a write request.
    #[must_use]
    pub fn new(endpoint: EndpointId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            endpoint,
            payload: payload.into(),
        }
    }
}

/// What to listen to, for how long, and what to send first.
///
/// ```
/// use openglass::{EndpointId, ListenRequest, WriteRequest};
///
/// let request = ListenRequest::builder()
///     .endpoints(vec![EndpointId::PhotoData])
///     .max_notifications(50)
///     .trigger(WriteRequest::new(EndpointId::PhotoControl, [0xFF]))
///     .build();
/// assert_eq!(Some(50), request.max_notifications());
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Builder)]
pub struct ListenRequest {
    endpoints: Vec<EndpointId>,
    max_notifications: Option<usize>,
    trigger: Option<WriteRequest>,
}

impl ListenRequest {
    /// Endpoints whose notifications are delivered.
    #[must_use]
    pub fn endpoints(&self) -> &[EndpointId] {
        &self.endpoints
    }

    /// Maximum number of notifications before the run stops.
    #[must_use]
    pub fn max_notifications(&self) -> Option<usize> {
        self.max_notifications
    }

    /// Write sent after the stream opens, so no early reply is missed.
    #[must_use]
    pub fn trigger(&self) -> Option<&WriteRequest> {
        self.trigger.as_ref()
    }
}

/// One notification delivered by a session.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Notification {
    /// 1-based arrival index within the run.
    pub index: usize,
    pub endpoint: EndpointId,
    pub payload: Vec<u8>,
}

/// Why a notification run ended.
#[derive(Debug, Clone, Eq, PartialEq, derive_more::Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenStopReason {
    /// The run reached the requested max notification count.
    #[display("reached max notifications ({_0})")]
    ReachedLimit(usize),
    /// The notification callback asked to stop.
    #[display("finished")]
    Finished,
    /// The notification stream ended naturally.
    #[display("notification stream closed")]
    NotificationStreamClosed,
    /// The run was cancelled by Ctrl+C or a timeout.
    #[display("cancelled")]
    Cancelled,
}

/// Summary of a notification stream run.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct NotificationRunSummary {
    received_notifications: usize,
    stop_reason: ListenStopReason,
}

impl NotificationRunSummary {
    /// Creates a notification run summary.
    pub(crate) fn new(received_notifications: usize, stop_reason: ListenStopReason) -> Self {
        Self {
            received_notifications,
            stop_reason,
        }
    }

    /// Returns the number of notifications received.
    #[must_use]
    pub fn received_notifications(&self) -> usize {
        self.received_notifications
    }

    /// Returns why notification listening ended.
    #[must_use]
    pub fn stop_reason(&self) -> &ListenStopReason {
        &self.stop_reason
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn presence_marks_discovered_uuids_case_insensitively() {
        let services = vec![ServiceInfo::new(
            "19b10000-e8f2-537e-4f6c-d104768a1214".to_string(),
            true,
            vec![CharacteristicInfo::new(
                "19b10005-e8f2-537e-4f6c-d104768a1214".to_string(),
                vec!["notify".to_string()],
            )],
        )];

        let presence = EndpointPresence::from_services(&services);
        assert!(presence.is_present(EndpointId::MainService));
        assert!(presence.is_present(EndpointId::PhotoData));
        assert!(!presence.is_present(EndpointId::AudioData));
        assert_eq!(9, presence.missing().len());
    }

    #[test]
    fn stop_reason_display() {
        assert_eq!(
            "reached max notifications (3)",
            ListenStopReason::ReachedLimit(3).to_string()
        );
        assert_eq!("cancelled", ListenStopReason::Cancelled.to_string());
    }
}
