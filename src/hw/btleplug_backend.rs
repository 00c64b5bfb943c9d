use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use super::hardware::{
    ConnectedBleSession, NotificationFlow, WriteMode, format_missing_endpoints,
    missing_required_endpoints,
};
use super::model::{
    CharacteristicInfo, EndpointPresence, FoundDevice, ListenRequest, ListenStopReason,
    Notification, NotificationRunSummary, ServiceInfo,
};
use crate::error::InteractionError;
use crate::protocol::{self, EndpointId, EndpointKind};

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Hardware backend backed by `btleplug`.
#[derive(Debug)]
pub(crate) struct BtleplugBackend {
    manager: Manager,
}

impl BtleplugBackend {
    /// Creates the real BLE backend.
    pub(crate) async fn new() -> Result<Self, InteractionError> {
        let manager = Manager::new().await?;
        Ok(Self { manager })
    }

    /// Scans indefinitely until the first matching peripheral appears, then connects.
    #[instrument(skip(self), level = "debug", fields(prefix = name_prefix))]
    async fn find_and_connect_first_matching(
        &self,
        name_prefix: &str,
    ) -> Result<(Peripheral, FoundDevice), InteractionError> {
        let adapters = self.adapters().await?;
        info!(
            adapter_count = adapters.len(),
            "starting indefinite BLE scan"
        );

        for adapter in &adapters {
            adapter.adapter.start_scan(ScanFilter::default()).await?;
        }

        loop {
            for adapter in &adapters {
                for peripheral in adapter.adapter.peripherals().await? {
                    let Some(properties) = peripheral.properties().await? else {
                        continue;
                    };
                    if !matches_name_prefix(properties.local_name.as_deref(), name_prefix) {
                        trace!(local_name = ?properties.local_name, "skipping peripheral");
                        continue;
                    }

                    for handle in &adapters {
                        if let Err(error) = handle.adapter.stop_scan().await {
                            debug!(?error, "failed to stop adapter scan cleanly");
                        }
                    }

                    if !peripheral.is_connected().await? {
                        peripheral.connect().await?;
                    }
                    peripheral.discover_services().await?;

                    let device = FoundDevice::new(
                        adapter.name.clone(),
                        peripheral.id().to_string(),
                        properties.local_name,
                        properties.rssi,
                    );
                    info!(device_id = device.device_id(), "connected to matching peripheral");
                    return Ok((peripheral, device));
                }
            }

            sleep(SCAN_POLL_INTERVAL).await;
        }
    }

    #[instrument(skip(self), level = "trace")]
    async fn adapters(&self) -> Result<Vec<AdapterHandle>, InteractionError> {
        let adapters = self.manager.adapters().await?;
        if adapters.is_empty() {
            return Err(InteractionError::NoAdapters);
        }

        let mut handles = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let name = adapter.adapter_info().await?;
            handles.push(AdapterHandle { adapter, name });
        }
        Ok(handles)
    }

    /// Connects to the first matching peripheral and validates its GATT layout.
    #[instrument(skip(self), level = "debug", fields(prefix = name_prefix))]
    pub(crate) async fn connect_first_matching_device(
        self,
        name_prefix: &str,
    ) -> Result<RealDeviceSession, InteractionError> {
        let (peripheral, device) = self.find_and_connect_first_matching(name_prefix).await?;
        let (services, characteristics_by_uuid) = collect_services_and_characteristics(&peripheral);
        let endpoint_presence = EndpointPresence::from_services(&services);

        let missing = missing_required_endpoints(&endpoint_presence);
        if !missing.is_empty() {
            if let Err(error) = peripheral.disconnect().await {
                debug!(
                    ?error,
                    "failed to disconnect after endpoint validation error"
                );
            }

            return Err(InteractionError::MissingRequiredEndpoints {
                missing: format_missing_endpoints(&missing),
            });
        }

        Ok(RealDeviceSession {
            device,
            services,
            endpoint_presence,
            characteristics_by_endpoint: characteristics_by_endpoint(&characteristics_by_uuid),
            peripheral,
        })
    }
}

fn matches_name_prefix(local_name: Option<&str>, name_prefix: &str) -> bool {
    if name_prefix.is_empty() {
        return true;
    }

    local_name.is_some_and(|value| value.starts_with(name_prefix))
}

/// Active session bound to a real peripheral.
#[derive(Debug)]
pub(crate) struct RealDeviceSession {
    device: FoundDevice,
    services: Vec<ServiceInfo>,
    endpoint_presence: EndpointPresence,
    characteristics_by_endpoint: HashMap<EndpointId, Characteristic>,
    peripheral: Peripheral,
}

impl RealDeviceSession {
    fn characteristic_for(
        &self,
        endpoint: EndpointId,
    ) -> Result<&Characteristic, InteractionError> {
        self.characteristics_by_endpoint
            .get(&endpoint)
            .ok_or(InteractionError::MissingEndpoint { endpoint })
    }
}

#[async_trait(?Send)]
impl ConnectedBleSession for RealDeviceSession {
    fn device(&self) -> &FoundDevice {
        &self.device
    }

    fn services(&self) -> &[ServiceInfo] {
        &self.services
    }

    fn endpoint_presence(&self) -> &EndpointPresence {
        &self.endpoint_presence
    }

    #[instrument(skip(self), level = "trace", fields(%endpoint))]
    async fn read_endpoint(&self, endpoint: EndpointId) -> Result<Vec<u8>, InteractionError> {
        let characteristic = self.characteristic_for(endpoint)?;
        let payload = self.peripheral.read(characteristic).await?;
        Ok(payload)
    }

    #[instrument(skip(self, payload), level = "trace", fields(%endpoint, ?mode, payload_len = payload.len()))]
    async fn write_endpoint(
        &self,
        endpoint: EndpointId,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), InteractionError> {
        let characteristic = self.characteristic_for(endpoint)?;
        let write_type = match mode {
            WriteMode::WithResponse => WriteType::WithResponse,
            WriteMode::WithoutResponse => WriteType::WithoutResponse,
        };
        self.peripheral
            .write(characteristic, payload, write_type)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "trace", fields(%endpoint))]
    async fn subscribe_endpoint(&self, endpoint: EndpointId) -> Result<(), InteractionError> {
        let characteristic = self.characteristic_for(endpoint)?;
        self.peripheral.subscribe(characteristic).await?;
        Ok(())
    }

    #[instrument(skip(self), level = "trace", fields(%endpoint))]
    async fn unsubscribe_endpoint(&self, endpoint: EndpointId) -> Result<(), InteractionError> {
        let characteristic = self.characteristic_for(endpoint)?;
        self.peripheral.unsubscribe(characteristic).await?;
        Ok(())
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
        let max_notifications = request.max_notifications();
        if let Some(limit) = max_notifications
            && limit == 0
        {
            return Ok(NotificationRunSummary::new(
                0,
                ListenStopReason::ReachedLimit(0),
            ));
        }

        let endpoint_by_uuid = request
            .endpoints()
            .iter()
            .map(|endpoint| {
                self.characteristic_for(*endpoint)
                    .map(|characteristic| (characteristic.uuid, *endpoint))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;
        let mut notifications = self.peripheral.notifications().await?;
        if let Some(trigger) = request.trigger() {
            self.write_endpoint(trigger.endpoint, &trigger.payload, WriteMode::WithResponse)
                .await?;
        }
        let mut received = 0usize;

        let stop_reason = loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    break ListenStopReason::Cancelled;
                }
                maybe_notification = notifications.next() => {
                    let Some(notification) = maybe_notification else {
                        break ListenStopReason::NotificationStreamClosed;
                    };
                    let Some(endpoint) = endpoint_by_uuid.get(&notification.uuid).copied() else {
                        trace!(uuid = %notification.uuid, "ignoring unsubscribed notification");
                        continue;
                    };

                    received += 1;
                    let flow = on_notification(Notification {
                        index: received,
                        endpoint,
                        payload: notification.value,
                    });
                    if flow == NotificationFlow::Stop {
                        break ListenStopReason::Finished;
                    }
                    if let Some(limit) = max_notifications && received >= limit {
                        break ListenStopReason::ReachedLimit(limit);
                    }
                }
            }
        };

        Ok(NotificationRunSummary::new(received, stop_reason))
    }

    #[instrument(skip(self), level = "debug")]
    async fn close(self: Box<Self>) -> Result<(), InteractionError> {
        if self.peripheral.is_connected().await? {
            self.peripheral.disconnect().await?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct AdapterHandle {
    adapter: Adapter,
    name: String,
}

fn collect_services_and_characteristics(
    peripheral: &Peripheral,
) -> (Vec<ServiceInfo>, HashMap<String, Characteristic>) {
    let mut services = Vec::new();
    let mut characteristics_by_uuid = HashMap::new();

    for service in peripheral.services() {
        let service_uuid = service.uuid.to_string().to_lowercase();

        let mut characteristics = Vec::new();
        for characteristic in &service.characteristics {
            let characteristic_uuid = characteristic.uuid.to_string().to_lowercase();
            characteristics_by_uuid
                .entry(characteristic_uuid.clone())
                .or_insert_with(|| characteristic.clone());

            characteristics.push(CharacteristicInfo::new(
                characteristic_uuid,
                property_labels(characteristic.properties),
            ));
        }
        characteristics.sort_by(|left, right| left.uuid().cmp(right.uuid()));

        services.push(ServiceInfo::new(
            service_uuid,
            service.primary,
            characteristics,
        ));
    }
    services.sort_by(|left, right| left.uuid().cmp(right.uuid()));

    (services, characteristics_by_uuid)
}

fn property_labels(flags: CharPropFlags) -> Vec<String> {
    let labels: Vec<String> = flags
        .iter_names()
        .map(|(name, _)| name.to_lowercase())
        .collect();
    if labels.is_empty() {
        vec!["none".to_string()]
    } else {
        labels
    }
}

/// Resolves discovered characteristics to known endpoints; absent ones are skipped.
fn characteristics_by_endpoint(
    characteristics_by_uuid: &HashMap<String, Characteristic>,
) -> HashMap<EndpointId, Characteristic> {
    protocol::known_endpoints()
        .filter(|endpoint| {
            protocol::endpoint_metadata(*endpoint).kind() == EndpointKind::Characteristic
        })
        .filter_map(|endpoint| {
            characteristics_by_uuid
                .get(&endpoint.uuid().to_lowercase())
                .cloned()
                .map(|characteristic| (endpoint, characteristic))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Some("OpenGlass"), "OpenGlass", true)]
    #[case(Some("OpenGlass-2"), "OpenGlass", true)]
    #[case(Some("Speaker"), "OpenGlass", false)]
    #[case(None, "OpenGlass", false)]
    #[case(None, "", true)]
    fn name_prefix_matching(
        #[case] local_name: Option<&str>,
        #[case] prefix: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(expected, matches_name_prefix(local_name, prefix));
    }

    #[test]
    fn property_labels_fall_back_to_none() {
        assert_eq!(vec!["none".to_string()], property_labels(CharPropFlags::empty()));
        assert_eq!(
            vec!["read".to_string(), "notify".to_string()],
            property_labels(CharPropFlags::READ | CharPropFlags::NOTIFY)
        );
    }
}
