use std::fmt::Debug;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::btleplug_backend::BtleplugBackend;
use super::fake_backend::{FakeBackend, FakeBackendConfig};
use super::model::{
    EndpointPresence, FoundDevice, InspectReport, ListenRequest, Notification,
    NotificationRunSummary, ServiceInfo,
};
use crate::error::InteractionError;
use crate::protocol::{self, EndpointId};

/// Endpoints a connected device must expose before a session is handed out.
pub(crate) const REQUIRED_ENDPOINTS: [EndpointId; 3] = [
    EndpointId::MainService,
    EndpointId::PhotoData,
    EndpointId::DeviceStatus,
];

/// GATT write mode for a characteristic write.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WriteMode {
    WithResponse,
    WithoutResponse,
}

/// What a notification callback wants the run loop to do next.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NotificationFlow {
    Continue,
    Stop,
}

/// Runtime BLE backend selection.
#[derive(Debug)]
pub(crate) enum HardwareBackend {
    Real,
    Fake(FakeBackendConfig),
}

/// Builds an injected hardware client for the selected runtime backend.
pub(crate) fn hardware_client_from_backend(backend: HardwareBackend) -> Box<dyn HardwareClient> {
    match backend {
        HardwareBackend::Real => real_hardware_client(),
        HardwareBackend::Fake(config) => {
            info!("using fake BLE backend");
            Box::new(FakeHardwareClient::new(config))
        }
    }
}

/// Returns a client bound to the platform BLE stack.
#[must_use]
pub fn real_hardware_client() -> Box<dyn HardwareClient> {
    Box::new(RealHardwareClient)
}

/// Returns a client that replays fixture data instead of touching hardware.
#[must_use]
pub fn fake_hardware_client(fake_args: crate::cli::FakeArgs) -> Box<dyn HardwareClient> {
    hardware_client_from_backend(HardwareBackend::Fake(fake_args.into_backend_config()))
}

#[async_trait]
pub trait HardwareClient: Send + Sync {
    /// Scans for, connects to and validates the first matching OpenGlass peripheral.
    async fn connect_first_device(
        self: Box<Self>,
        name_prefix: &str,
    ) -> Result<DeviceSession, InteractionError>;
}

#[derive(Debug)]
struct RealHardwareClient;

#[async_trait]
impl HardwareClient for RealHardwareClient {
    async fn connect_first_device(
        self: Box<Self>,
        name_prefix: &str,
    ) -> Result<DeviceSession, InteractionError> {
        let backend = BtleplugBackend::new().await?;
        let session = backend.connect_first_matching_device(name_prefix).await?;
        Ok(DeviceSession::new(Box::new(session)))
    }
}

#[derive(Debug)]
struct FakeHardwareClient {
    backend: FakeBackend,
}

impl FakeHardwareClient {
    fn new(config: FakeBackendConfig) -> Self {
        Self {
            backend: FakeBackend::new(config),
        }
    }
}

#[async_trait]
impl HardwareClient for FakeHardwareClient {
    async fn connect_first_device(
        self: Box<Self>,
        name_prefix: &str,
    ) -> Result<DeviceSession, InteractionError> {
        let Self { backend } = *self;
        let session = backend.connect_first_matching_device(name_prefix).await?;
        Ok(DeviceSession::new(Box::new(session)))
    }
}

/// Backend-specific half of a connected session.
#[async_trait(?Send)]
pub(crate) trait ConnectedBleSession: Debug + Send + Sync {
    fn device(&self) -> &FoundDevice;

    fn services(&self) -> &[ServiceInfo];

    fn endpoint_presence(&self) -> &EndpointPresence;

    async fn read_endpoint(&self, endpoint: EndpointId) -> Result<Vec<u8>, InteractionError>;

    async fn write_endpoint(
        &self,
        endpoint: EndpointId,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), InteractionError>;

    async fn subscribe_endpoint(&self, endpoint: EndpointId) -> Result<(), InteractionError>;

    async fn unsubscribe_endpoint(&self, endpoint: EndpointId) -> Result<(), InteractionError>;

    async fn run_notifications(
        &self,
        request: &ListenRequest,
        cancel: CancellationToken,
        on_notification: &mut dyn FnMut(Notification) -> NotificationFlow,
    ) -> Result<NotificationRunSummary, InteractionError>;

    async fn close(self: Box<Self>) -> Result<(), InteractionError>;
}

/// A connected OpenGlass peripheral.
#[derive(Debug)]
pub struct DeviceSession {
    inner: Box<dyn ConnectedBleSession>,
}

impl DeviceSession {
    pub(crate) fn new(inner: Box<dyn ConnectedBleSession>) -> Self {
        Self { inner }
    }

    /// Returns details for the connected device.
    #[must_use]
    pub fn device(&self) -> &FoundDevice {
        self.inner.device()
    }

    /// Returns the services discovered on connect.
    #[must_use]
    pub fn services(&self) -> &[ServiceInfo] {
        self.inner.services()
    }

    /// Builds an inspect report from the discovered GATT layout.
    #[must_use]
    pub fn inspect_report(&self) -> InspectReport {
        InspectReport::new(
            self.inner.device().clone(),
            self.inner.services().to_vec(),
            self.inner.endpoint_presence().clone(),
        )
    }

    /// Reads the current value of a characteristic.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is absent or the read fails.
    pub async fn read_endpoint(&self, endpoint: EndpointId) -> Result<Vec<u8>, InteractionError> {
        self.inner.read_endpoint(endpoint).await
    }

    /// Writes a payload to a characteristic.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is absent or the write fails.
    pub async fn write_endpoint(
        &self,
        endpoint: EndpointId,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), InteractionError> {
        self.inner.write_endpoint(endpoint, payload, mode).await
    }

    /// Enables notifications for a characteristic.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is absent or the subscription fails.
    pub async fn subscribe_endpoint(&self, endpoint: EndpointId) -> Result<(), InteractionError> {
        self.inner.subscribe_endpoint(endpoint).await
    }

    /// Disables notifications for a characteristic.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is absent or the request fails.
    pub async fn unsubscribe_endpoint(&self, endpoint: EndpointId) -> Result<(), InteractionError> {
        self.inner.unsubscribe_endpoint(endpoint).await
    }

    /// Subscribes to the requested endpoints, sends the trigger write, and
    /// feeds every notification to the callback until the limit is hit, the
    /// callback stops, the stream closes, or `cancel` fires. Subscriptions are
    /// released before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if subscribing, the trigger write, or receiving
    /// notifications fails.
    pub async fn run_notifications<F>(
        &self,
        request: &ListenRequest,
        cancel: CancellationToken,
        mut on_notification: F,
    ) -> Result<NotificationRunSummary, InteractionError>
    where
        F: FnMut(Notification) -> NotificationFlow,
    {
        let mut subscribed = Vec::with_capacity(request.endpoints().len());
        for endpoint in request.endpoints() {
            if let Err(error) = self.subscribe_endpoint(*endpoint).await {
                self.release_subscriptions(&subscribed).await;
                return Err(error);
            }
            subscribed.push(*endpoint);
        }

        let summary = self
            .inner
            .run_notifications(request, cancel, &mut on_notification)
            .await;

        self.release_subscriptions(&subscribed).await;
        summary
    }

    async fn release_subscriptions(&self, endpoints: &[EndpointId]) {
        for endpoint in endpoints {
            if let Err(error) = self.unsubscribe_endpoint(*endpoint).await {
                tracing::debug!(%endpoint, ?error, "failed to unsubscribe cleanly");
            }
        }
    }

    /// Disconnects from the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to disconnect.
    pub async fn close(self) -> Result<(), InteractionError> {
        self.inner.close().await
    }
}

/// Returns required endpoints that the device does not expose.
pub(crate) fn missing_required_endpoints(presence: &EndpointPresence) -> Vec<EndpointId> {
    REQUIRED_ENDPOINTS
        .into_iter()
        .filter(|endpoint| !presence.is_present(*endpoint))
        .collect()
}

/// Formats endpoints as `name (uuid)` for error messages.
pub(crate) fn format_missing_endpoints(endpoints: &[EndpointId]) -> String {
    endpoints
        .iter()
        .map(|endpoint| {
            let metadata = protocol::endpoint_metadata(*endpoint);
            format!("{} ({})", metadata.name(), metadata.uuid())
        })
        .collect::<Vec<_>>()
        .join(", ")
}
