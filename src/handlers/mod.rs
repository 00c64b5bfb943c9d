mod audio;
mod control;
mod device_status;
mod frame_codec;
mod hotspot;
mod reassembler;
mod video_status;

pub use self::audio::{
    AudioAccumulator, AudioCodec, AudioConfig, AudioError, AudioStats, SampleBuffer,
};
pub use self::control::{
    ControlError, HotspotCommand, PHOTO_INTERVAL_SECS, PhotoControl, VIDEO_FPS, VideoControl,
};
pub use self::device_status::{
    DeviceStatus, DeviceStatusError, DeviceStatusTracker, StatusReading,
};
pub use self::frame_codec::{
    ChannelKind, DecodedFrame, END_SENTINEL_SEQUENCE, Frame, FrameCodec, FrameCodecError,
};
pub use self::hotspot::{
    ActiveInterfaces, HotspotDecodeError, HotspotField, HotspotState, HotspotStatus,
    TruncatedField,
};
pub use self::reassembler::{
    CompletedTransfer, ReassemblyError, TransferEvent, TransferKind, TransferReassembler,
    TransferState,
};
pub use self::video_status::{VideoStatus, VideoStatusError};
