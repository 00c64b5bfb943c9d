mod btleplug_backend;
mod fake_backend;
mod hardware;
mod model;

pub(crate) use self::fake_backend::{EndpointPayloads, FakeBackendConfig, ScanFixture};
pub use self::hardware::{
    DeviceSession, HardwareClient, NotificationFlow, WriteMode, fake_hardware_client,
    real_hardware_client,
};
pub use self::model::{
    CharacteristicInfo, EndpointPresence, FoundDevice, InspectReport, ListenRequest,
    ListenStopReason, Notification, NotificationRunSummary, ServiceInfo, WriteRequest,
};
