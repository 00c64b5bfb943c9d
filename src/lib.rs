mod app;
mod cli;
mod error;
mod handlers;
mod hw;
mod notification;
mod protocol;
mod telemetry;
mod terminal;
mod utils;

pub use app::{SessionHandler, run, run_with_clients};
pub use cli::{
    Args, AudioArgs, Command, FakeArgs, HotspotAction, HotspotArgs, LogLevel, OutputFormat,
    PhotoArgs, StatusArgs, VideoArgs,
};
pub use error::{FixtureError, InteractionError, ProtocolError};
pub use handlers::{
    ActiveInterfaces, AudioAccumulator, AudioCodec, AudioConfig, AudioError, AudioStats,
    ChannelKind, CompletedTransfer, ControlError, DecodedFrame, DeviceStatus, DeviceStatusError,
    DeviceStatusTracker, END_SENTINEL_SEQUENCE, Frame, FrameCodec, FrameCodecError,
    HotspotCommand, HotspotDecodeError, HotspotField, HotspotState, HotspotStatus,
    PHOTO_INTERVAL_SECS, PhotoControl, ReassemblyError, SampleBuffer, StatusReading,
    TransferEvent, TransferKind, TransferReassembler, TransferState, TruncatedField, VIDEO_FPS,
    VideoControl, VideoStatus, VideoStatusError,
};
pub use hw::{
    CharacteristicInfo, DeviceSession, EndpointPresence, FoundDevice, HardwareClient,
    InspectReport, ListenRequest, ListenStopReason, Notification, NotificationFlow,
    NotificationRunSummary, ServiceInfo, WriteMode, WriteRequest, fake_hardware_client,
    real_hardware_client,
};
pub use notification::{NotificationHandler, NotifyEvent};
pub use protocol::{EndpointId, endpoint_for_uuid};
pub use terminal::TerminalClient;
