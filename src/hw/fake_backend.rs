use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::hardware::{
    ConnectedBleSession, NotificationFlow, WriteMode, format_missing_endpoints,
    missing_required_endpoints,
};
use super::model::{
    CharacteristicInfo, EndpointPresence, FoundDevice, ListenRequest, ListenStopReason,
    Notification, NotificationRunSummary, ServiceInfo,
};
use crate::error::{FixtureError, InteractionError};
use crate::protocol::{self, EndpointId, EndpointKind};

const DEFAULT_READS: [(EndpointId, &[u8]); 2] = [
    (EndpointId::AudioCodec, &[0x01]),
    (EndpointId::DeviceStatus, &[0x03]),
];

/// A short session touching every notifying channel once.
const DEFAULT_NOTIFICATIONS: [(EndpointId, &[u8]); 9] = [
    (EndpointId::DeviceStatus, &[0x07]),
    (EndpointId::DeviceStatus, &[0x03]),
    (EndpointId::PhotoData, &[0x00, 0x00, 0x01, 0xFF, 0xD8, 0xFF]),
    (EndpointId::PhotoData, &[0x01, 0x00, 0x01, 0xD9]),
    (EndpointId::PhotoData, &[0xFF, 0xFF, 0x01]),
    (EndpointId::AudioData, &[0x00, 0x00, 0x00, 0x10, 0x00, 0xF0, 0xFF]),
    (EndpointId::VideoData, &[0x00, 0x00, 0x02, 0xAB]),
    (EndpointId::VideoData, &[0xFF, 0xFF, 0x02]),
    (EndpointId::HotspotStatus, &[0x02, 0x01, 0x04, 0x01, 0x03]),
];

/// Parsed fake scan fixture records.
#[derive(Debug, Clone, derive_more::Into)]
pub(crate) struct ScanFixture {
    devices: Vec<FoundDevice>,
}

impl FromStr for ScanFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let devices = parse_scan_fixture(value)?;
        Ok(Self { devices })
    }
}

/// Parsed `endpoint=hex` fixture records, in order.
#[derive(Debug, Clone, Eq, PartialEq, derive_more::Into)]
pub(crate) struct EndpointPayloads {
    entries: Vec<(EndpointId, Vec<u8>)>,
}

impl FromStr for EndpointPayloads {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() {
            return Ok(Self {
                entries: Vec::new(),
            });
        }
        let entries = value
            .split(',')
            .map(parse_endpoint_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }
}

/// Settings for constructing a fake hardware backend.
#[derive(Debug, Builder)]
pub(crate) struct FakeBackendConfig {
    scan_fixture: ScanFixture,
    reads: Option<EndpointPayloads>,
    notifications: Option<EndpointPayloads>,
    #[builder(default)]
    discovery_delay: Duration,
    #[builder(default)]
    notification_interval: Duration,
}

/// Fake backend used in tests and non-hardware environments.
#[derive(Debug)]
pub(crate) struct FakeBackend {
    devices: Vec<FoundDevice>,
    reads: HashMap<EndpointId, Vec<u8>>,
    notifications: Vec<(EndpointId, Vec<u8>)>,
    discovery_delay: Duration,
    notification_interval: Duration,
}

impl FakeBackend {
    /// Creates a fake backend from explicit settings.
    pub(crate) fn new(config: FakeBackendConfig) -> Self {
        let mut reads: HashMap<EndpointId, Vec<u8>> = DEFAULT_READS
            .into_iter()
            .map(|(endpoint, payload)| (endpoint, payload.to_vec()))
            .collect();
        if let Some(overrides) = config.reads {
            let overrides: Vec<_> = overrides.into();
            reads.extend(overrides);
        }
        let notifications = config.notifications.map_or_else(
            || {
                DEFAULT_NOTIFICATIONS
                    .into_iter()
                    .map(|(endpoint, payload)| (endpoint, payload.to_vec()))
                    .collect()
            },
            Into::into,
        );

        Self {
            devices: config.scan_fixture.into(),
            reads,
            notifications,
            discovery_delay: config.discovery_delay,
            notification_interval: config.notification_interval,
        }
    }

    /// Picks the first fixture device matching the prefix and "connects" to it.
    #[instrument(skip(self), level = "debug", fields(prefix = name_prefix))]
    pub(crate) async fn connect_first_matching_device(
        self,
        name_prefix: &str,
    ) -> Result<FakeDeviceSession, InteractionError> {
        let Self {
            devices,
            reads,
            notifications,
            discovery_delay,
            notification_interval,
        } = self;
        let device = first_matching_device(devices, discovery_delay, name_prefix).await?;
        let services = default_services();
        let endpoint_presence = EndpointPresence::from_services(&services);

        let missing = missing_required_endpoints(&endpoint_presence);
        if !missing.is_empty() {
            return Err(InteractionError::MissingRequiredEndpoints {
                missing: format_missing_endpoints(&missing),
            });
        }

        info!(device_id = device.device_id(), "connected to fake peripheral");
        Ok(FakeDeviceSession {
            device,
            services,
            endpoint_presence,
            reads,
            notifications,
            notification_interval,
        })
    }
}

/// A connected fake session replaying fixture data.
#[derive(Debug)]
pub(crate) struct FakeDeviceSession {
    device: FoundDevice,
    services: Vec<ServiceInfo>,
    endpoint_presence: EndpointPresence,
    reads: HashMap<EndpointId, Vec<u8>>,
    notifications: Vec<(EndpointId, Vec<u8>)>,
    notification_interval: Duration,
}

impl FakeDeviceSession {
    fn ensure_present(&self, endpoint: EndpointId) -> Result<(), InteractionError> {
        if self.endpoint_presence.is_present(endpoint) {
            Ok(())
        } else {
            Err(InteractionError::MissingEndpoint { endpoint })
        }
    }
}

#[async_trait(?Send)]
impl ConnectedBleSession for FakeDeviceSession {
    fn device(&self) -> &FoundDevice {
        &self.device
    }

    fn services(&self) -> &[ServiceInfo] {
        &self.services
    }

    fn endpoint_presence(&self) -> &EndpointPresence {
        &self.endpoint_presence
    }

    async fn read_endpoint(&self, endpoint: EndpointId) -> Result<Vec<u8>, InteractionError> {
        self.ensure_present(endpoint)?;
        Ok(self.reads.get(&endpoint).cloned().unwrap_or_default())
    }

    async fn write_endpoint(
        &self,
        endpoint: EndpointId,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), InteractionError> {
        self.ensure_present(endpoint)?;
        debug!(%endpoint, ?mode, payload = %hex::encode(payload), "fake write");
        Ok(())
    }

    async fn subscribe_endpoint(&self, endpoint: EndpointId) -> Result<(), InteractionError> {
        self.ensure_present(endpoint)
    }

    async fn unsubscribe_endpoint(&self, endpoint: EndpointId) -> Result<(), InteractionError> {
        self.ensure_present(endpoint)
    }

    #[instrument(
        skip(self, request, cancel, on_notification),
        level = "debug",
        fields(endpoints = ?request.endpoints(), max_notifications = ?request.max_notifications())
    )]
    async fn run_notifications(
        &self,
        request: &ListenRequest,
        cancel: CancellationToken,
        on_notification: &mut dyn FnMut(Notification) -> NotificationFlow,
    ) -> Result<NotificationRunSummary, InteractionError> {
        if let Some(trigger) = request.trigger() {
            self.write_endpoint(trigger.endpoint, &trigger.payload, WriteMode::WithResponse)
                .await?;
        }

        let max_notifications = request.max_notifications();
        if let Some(limit) = max_notifications
            && limit == 0
        {
            return Ok(NotificationRunSummary::new(
                0,
                ListenStopReason::ReachedLimit(0),
            ));
        }

        let subscribed = self
            .notifications
            .iter()
            .filter(|(endpoint, _)| request.endpoints().contains(endpoint));
        let mut received = 0usize;
        let mut stop_reason = ListenStopReason::NotificationStreamClosed;
        for (endpoint, payload) in subscribed {
            if self.notification_interval.is_zero() {
                if cancel.is_cancelled() {
                    stop_reason = ListenStopReason::Cancelled;
                    break;
                }
            } else {
                tokio::select! {
                    () = cancel.cancelled() => {
                        stop_reason = ListenStopReason::Cancelled;
                        break;
                    }
                    () = sleep(self.notification_interval) => {}
                }
            }

            received += 1;
            let flow = on_notification(Notification {
                index: received,
                endpoint: *endpoint,
                payload: payload.clone(),
            });
            if flow == NotificationFlow::Stop {
                stop_reason = ListenStopReason::Finished;
                break;
            }
            if let Some(limit) = max_notifications
                && received >= limit
            {
                stop_reason = ListenStopReason::ReachedLimit(limit);
                break;
            }
        }

        Ok(NotificationRunSummary::new(received, stop_reason))
    }

    async fn close(self: Box<Self>) -> Result<(), InteractionError> {
        Ok(())
    }
}

fn parse_scan_fixture(raw_fixture: &str) -> Result<Vec<FoundDevice>, FixtureError> {
    if raw_fixture.trim().is_empty() {
        return Err(FixtureError::EmptyFixture);
    }

    raw_fixture
        .split(';')
        .map(parse_scan_record)
        .collect::<Result<Vec<_>, _>>()
}

async fn first_matching_device(
    devices: Vec<FoundDevice>,
    discovery_delay: Duration,
    name_prefix: &str,
) -> Result<FoundDevice, InteractionError> {
    if !discovery_delay.is_zero() {
        sleep(discovery_delay).await;
    }

    devices
        .into_iter()
        .find(|device| device.local_name_starts_with(name_prefix))
        .ok_or_else(|| InteractionError::NoMatchingFixtureDevice {
            prefix: name_prefix.to_string(),
        })
}

fn parse_scan_record(raw_record: &str) -> Result<FoundDevice, FixtureError> {
    let fields: Vec<&str> = raw_record.split('|').map(str::trim).collect();
    let [adapter, device_id, local_name, rssi] = fields.as_slice() else {
        return Err(FixtureError::InvalidRecordFieldCount);
    };
    if [adapter, device_id, local_name, rssi]
        .iter()
        .any(|field| field.is_empty())
    {
        return Err(FixtureError::EmptyRecordField);
    }

    let local_name = (*local_name != "-").then(|| local_name.to_string());
    let rssi = if *rssi == "-" {
        None
    } else {
        Some(rssi.parse::<i16>()?)
    };

    Ok(FoundDevice::new(
        adapter.to_string(),
        device_id.to_string(),
        local_name,
        rssi,
    ))
}

fn parse_endpoint_record(raw_record: &str) -> Result<(EndpointId, Vec<u8>), FixtureError> {
    let Some((name, payload)) = raw_record.split_once('=') else {
        return Err(FixtureError::InvalidNotificationRecord {
            record: raw_record.trim().to_string(),
        });
    };
    let name = name.trim();
    let endpoint = protocol::known_endpoints()
        .find(|endpoint| endpoint.to_string() == name)
        .ok_or_else(|| FixtureError::UnknownEndpoint {
            name: name.to_string(),
        })?;
    Ok((endpoint, parse_hex(payload)?))
}

fn parse_hex(raw_value: &str) -> Result<Vec<u8>, FixtureError> {
    let cleaned: String = raw_value.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&cleaned).map_err(|source| FixtureError::InvalidHex {
        value: cleaned,
        source,
    })
}

fn default_services() -> Vec<ServiceInfo> {
    let characteristics = protocol::known_endpoints()
        .map(protocol::endpoint_metadata)
        .filter(|metadata| metadata.kind() == EndpointKind::Characteristic)
        .map(|metadata| {
            CharacteristicInfo::new(
                metadata.uuid().to_lowercase(),
                default_properties(metadata.name()),
            )
        })
        .collect();

    vec![ServiceInfo::new(
        EndpointId::MainService.uuid().to_lowercase(),
        true,
        characteristics,
    )]
}

fn default_properties(name: &str) -> Vec<String> {
    let labels: &[&str] = if name.ends_with("control") {
        &["write"]
    } else if name == "audio codec" {
        &["read"]
    } else {
        &["read", "notify"]
    };
    labels.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn backend(notifications: &str) -> FakeBackend {
        FakeBackend::new(
            FakeBackendConfig::builder()
                .scan_fixture(
                    "hci0|AA:BB|OpenGlass|-43"
                        .parse()
                        .expect("scan fixture should parse"),
                )
                .notifications(notifications.parse().expect("notifications should parse"))
                .build(),
        )
    }

    fn status_request(max_notifications: Option<usize>) -> ListenRequest {
        ListenRequest::builder()
            .endpoints(vec![EndpointId::DeviceStatus])
            .maybe_max_notifications(max_notifications)
            .build()
    }

    #[rstest]
    #[case("hci0|AA:BB|OpenGlass|-43", 1)]
    #[case("hci0|AA:BB|OpenGlass|-43;hci1|CC:DD|Speaker|-", 2)]
    fn parse_scan_fixture_parses_records(#[case] fixture: &str, #[case] expected_count: usize) {
        let devices = parse_scan_fixture(fixture).expect("fixture should parse");
        assert_eq!(expected_count, devices.len());
    }

    #[test]
    fn parse_scan_fixture_rejects_invalid_field_count() {
        let result = parse_scan_fixture("hci0|AA:BB|OpenGlass");
        assert_matches!(result, Err(FixtureError::InvalidRecordFieldCount));
    }

    #[test]
    fn parses_endpoint_payload_records() {
        let payloads: EndpointPayloads = "photo_data=00 00 01 AA, device_status=03"
            .parse()
            .expect("records should parse");
        let entries: Vec<_> = payloads.into();
        assert_eq!(
            vec![
                (EndpointId::PhotoData, vec![0x00, 0x00, 0x01, 0xAA]),
                (EndpointId::DeviceStatus, vec![0x03]),
            ],
            entries
        );
    }

    #[rstest]
    #[case::missing_separator("photo_data")]
    #[case::unknown_endpoint("camera=00")]
    #[case::odd_hex("photo_data=A")]
    fn rejects_malformed_endpoint_records(#[case] record: &str) {
        assert!(record.parse::<EndpointPayloads>().is_err());
    }

    #[test]
    fn default_services_cover_every_endpoint() {
        let presence = EndpointPresence::from_services(&default_services());
        assert_eq!(Vec::<EndpointId>::new(), presence.missing());
    }

    #[tokio::test]
    async fn replays_only_subscribed_endpoints() {
        let session = backend("device_status=01,photo_data=FFFF01,device_status=03")
            .connect_first_matching_device("OpenGlass")
            .await
            .expect("fixture device should connect");

        let mut seen = Vec::new();
        let summary = session
            .run_notifications(
                &status_request(None),
                CancellationToken::new(),
                &mut |notification| {
                    seen.push((notification.index, notification.payload));
                    NotificationFlow::Continue
                },
            )
            .await
            .expect("fake run should succeed");

        assert_eq!(vec![(1, vec![0x01]), (2, vec![0x03])], seen);
        assert_eq!(
            &ListenStopReason::NotificationStreamClosed,
            summary.stop_reason()
        );
    }

    #[tokio::test]
    async fn callback_stop_ends_the_run() {
        let session = backend("device_status=01,device_status=03")
            .connect_first_matching_device("OpenGlass")
            .await
            .expect("fixture device should connect");

        let summary = session
            .run_notifications(
                &status_request(Some(5)),
                CancellationToken::new(),
                &mut |_| NotificationFlow::Stop,
            )
            .await
            .expect("fake run should succeed");

        assert_eq!(1, summary.received_notifications());
        assert_eq!(&ListenStopReason::Finished, summary.stop_reason());
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_notification() {
        let session = backend("device_status=01")
            .connect_first_matching_device("OpenGlass")
            .await
            .expect("fixture device should connect");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = session
            .run_notifications(&status_request(None), cancel, &mut |_| {
                NotificationFlow::Continue
            })
            .await
            .expect("fake run should succeed");

        assert_eq!(0, summary.received_notifications());
        assert_eq!(&ListenStopReason::Cancelled, summary.stop_reason());
    }

    #[tokio::test]
    async fn unmatched_prefix_is_reported() {
        let result = backend("")
            .connect_first_matching_device("Speaker")
            .await;
        assert_matches!(
            result,
            Err(InteractionError::NoMatchingFixtureDevice { prefix }) if prefix == "Speaker"
        );
    }
}
