use derive_more::From;
use thiserror::Error;

use crate::handlers::{
    AudioError, ControlError, DeviceStatusError, FrameCodecError, HotspotDecodeError,
    ReassemblyError, VideoStatusError,
};
use crate::protocol::{EndpointId, endpoint_metadata};

/// Errors returned by BLE interaction operations.
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("BLE operation failed")]
    Ble(#[from] btleplug::Error),
    #[error("no BLE adapters were found")]
    NoAdapters,
    #[error("no OpenGlass device matching `{prefix}*` was found in the fake fixture")]
    NoMatchingFixtureDevice { prefix: String },
    #[error(
        "required endpoint `{name}` ({uuid}) was not found on the connected device",
        name = endpoint_metadata(*endpoint).name(),
        uuid = endpoint_metadata(*endpoint).uuid()
    )]
    MissingEndpoint { endpoint: EndpointId },
    #[error("required OpenGlass endpoints are missing: {missing}")]
    MissingRequiredEndpoints { missing: String },
    #[error(transparent)]
    Fixture(#[from] FixtureError),
}

/// Errors returned when parsing fake interaction fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("the fake discovery fixture is empty")]
    EmptyFixture,
    #[error("fixture records must contain four pipe-delimited fields")]
    InvalidRecordFieldCount,
    #[error("fixture records cannot contain empty mandatory fields")]
    EmptyRecordField,
    #[error("failed to parse RSSI value")]
    InvalidRssi(#[from] std::num::ParseIntError),
    #[error("invalid hex payload `{value}`")]
    InvalidHex {
        value: String,
        source: hex::FromHexError,
    },
    #[error("notification fixtures must look like `endpoint=hex`, got `{record}`")]
    InvalidNotificationRecord { record: String },
    #[error("unknown endpoint `{name}` in notification fixture")]
    UnknownEndpoint { name: String },
}

/// Errors returned when validating runtime backend options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("missing fake scan fixture while fake mode is enabled")]
    MissingFakeScanFixture,
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level protocol errors wrapping module-specific error types.
#[derive(Debug, Error, From)]
pub enum ProtocolError {
    #[error(transparent)]
    #[from(FrameCodecError, Box<FrameCodecError>)]
    FrameCodec(Box<FrameCodecError>),
    #[error(transparent)]
    #[from(ReassemblyError, Box<ReassemblyError>)]
    Reassembly(Box<ReassemblyError>),
    #[error(transparent)]
    #[from(DeviceStatusError, Box<DeviceStatusError>)]
    DeviceStatus(Box<DeviceStatusError>),
    #[error(transparent)]
    #[from(AudioError, Box<AudioError>)]
    Audio(Box<AudioError>),
    #[error(transparent)]
    #[from(HotspotDecodeError, Box<HotspotDecodeError>)]
    Hotspot(Box<HotspotDecodeError>),
    #[error(transparent)]
    #[from(VideoStatusError, Box<VideoStatusError>)]
    VideoStatus(Box<VideoStatusError>),
    #[error(transparent)]
    #[from(ControlError, Box<ControlError>)]
    Control(Box<ControlError>),
    #[error(transparent)]
    #[from(InteractionError, Box<InteractionError>)]
    Interaction(Box<InteractionError>),
}
