use tracing::{debug, instrument};

use crate::error::ProtocolError;
use crate::handlers::{
    AudioAccumulator, AudioConfig, ChannelKind, DecodedFrame, DeviceStatus, DeviceStatusTracker,
    FrameCodec, HotspotStatus, TransferEvent, TransferKind, TransferReassembler, VideoStatus,
};
use crate::protocol::EndpointId;

/// Typed events produced by routing one notification.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NotifyEvent {
    /// A photo or video transfer advanced or completed.
    Transfer {
        channel: ChannelKind,
        event: TransferEvent,
    },
    /// An end sentinel arrived with no transfer in flight.
    TransferIgnored { channel: ChannelKind },
    /// A device status byte was recorded.
    DeviceStatus(DeviceStatus),
    /// An audio chunk was accumulated (or dropped as header-only).
    AudioChunk { total_bytes: usize },
    /// A fresh hotspot snapshot.
    Hotspot(HotspotStatus),
    /// Fresh video streaming counters.
    VideoStatus(VideoStatus),
    /// Payload from an endpoint that carries no notifications.
    Unrouted(Vec<u8>),
}

/// Routes notifications to one state machine per OpenGlass channel.
///
/// Each channel's state is owned here and touched only by notifications from
/// that channel, so an error on one channel never disturbs another.
#[derive(Debug, Clone)]
pub struct NotificationHandler {
    photo: TransferReassembler,
    video: TransferReassembler,
    status: DeviceStatusTracker,
    audio: AudioAccumulator,
    hotspot: Option<HotspotStatus>,
    video_status: Option<VideoStatus>,
}

impl Default for NotificationHandler {
    fn default() -> Self {
        Self::new(AudioConfig::default())
    }
}

impl NotificationHandler {
    /// Creates a router with photo and streaming reassemblers.
    #[must_use]
    pub fn new(audio_config: AudioConfig) -> Self {
        Self {
            photo: TransferReassembler::new(TransferKind::Photo),
            video: TransferReassembler::new(TransferKind::Streaming),
            status: DeviceStatusTracker::new(),
            audio: AudioAccumulator::new(audio_config),
            hotspot: None,
            video_status: None,
        }
    }

    /// Caps every photo and video transfer at `limit` bytes.
    #[must_use]
    pub fn with_max_transfer_bytes(mut self, limit: usize) -> Self {
        self.photo = self.photo.with_max_bytes(limit);
        self.video = self.video.with_max_bytes(limit);
        self
    }

    /// Routes one notification payload by its source endpoint.
    ///
    /// # Errors
    ///
    /// Returns the decoding or reassembly error for the offending packet. The
    /// packet is discarded and every channel stays ready for the next one.
    ///
    /// ```
    /// use openglass::{EndpointId, NotificationHandler, NotifyEvent, TransferEvent};
    ///
    /// let mut handler = NotificationHandler::default();
    /// handler.handle(EndpointId::PhotoData, &[0x00, 0x00, 0x01, 0xAA, 0xBB])?;
    /// handler.handle(EndpointId::PhotoData, &[0x01, 0x00, 0x01, 0xCC])?;
    /// let event = handler.handle(EndpointId::PhotoData, &[0xFF, 0xFF, 0x01])?;
    ///
    /// let NotifyEvent::Transfer { event: TransferEvent::Completed(photo), .. } = event else {
    ///     unreachable!()
    /// };
    /// assert_eq!(&[0xAA, 0xBB, 0xCC], photo.bytes());
    /// # Ok::<(), openglass::ProtocolError>(())
    /// ```
    #[instrument(skip(self, payload), level = "trace", fields(%endpoint, payload_len = payload.len()))]
    pub fn handle(
        &mut self,
        endpoint: EndpointId,
        payload: &[u8],
    ) -> Result<NotifyEvent, ProtocolError> {
        let result = self.route(endpoint, payload);
        if let Err(error) = &result {
            debug!(%endpoint, %error, "dropping notification");
        }
        result
    }

    fn route(&mut self, endpoint: EndpointId, payload: &[u8]) -> Result<NotifyEvent, ProtocolError> {
        match endpoint {
            EndpointId::PhotoData => {
                Self::on_transfer(ChannelKind::Photo, &mut self.photo, payload)
            }
            EndpointId::VideoData => {
                Self::on_transfer(ChannelKind::Video, &mut self.video, payload)
            }
            EndpointId::AudioData => {
                FrameCodec::decode(ChannelKind::Audio, payload)?;
                let total_bytes = self.audio.append_chunk(payload);
                Ok(NotifyEvent::AudioChunk { total_bytes })
            }
            EndpointId::DeviceStatus => {
                let status = self.status.on_status_payload(payload)?;
                Ok(NotifyEvent::DeviceStatus(status))
            }
            EndpointId::HotspotStatus => {
                let status = HotspotStatus::decode(payload)?;
                self.hotspot = Some(status.clone());
                Ok(NotifyEvent::Hotspot(status))
            }
            EndpointId::VideoStatus => {
                let status = VideoStatus::decode(payload)?;
                self.video_status = Some(status);
                Ok(NotifyEvent::VideoStatus(status))
            }
            EndpointId::MainService
            | EndpointId::AudioCodec
            | EndpointId::PhotoControl
            | EndpointId::VideoControl
            | EndpointId::HotspotControl => Ok(NotifyEvent::Unrouted(payload.to_vec())),
        }
    }

    fn on_transfer(
        channel: ChannelKind,
        reassembler: &mut TransferReassembler,
        payload: &[u8],
    ) -> Result<NotifyEvent, ProtocolError> {
        let event = match FrameCodec::decode(channel, payload)? {
            DecodedFrame::Data(frame) => reassembler.on_frame(&frame)?,
            DecodedFrame::EndSentinel { kind } => match reassembler.on_end_sentinel(kind) {
                Some(completed) => TransferEvent::Completed(completed),
                None => return Ok(NotifyEvent::TransferIgnored { channel }),
            },
        };
        Ok(NotifyEvent::Transfer { channel, event })
    }

    /// Returns the photo reassembler.
    #[must_use]
    pub fn photo(&self) -> &TransferReassembler {
        &self.photo
    }

    /// Returns the video frame reassembler.
    #[must_use]
    pub fn video(&self) -> &TransferReassembler {
        &self.video
    }

    /// Returns the device status history.
    #[must_use]
    pub fn status(&self) -> &DeviceStatusTracker {
        &self.status
    }

    /// Returns the audio accumulator.
    #[must_use]
    pub fn audio(&self) -> &AudioAccumulator {
        &self.audio
    }

    /// Returns the most recent hotspot snapshot.
    #[must_use]
    pub fn latest_hotspot(&self) -> Option<&HotspotStatus> {
        self.hotspot.as_ref()
    }

    /// Returns the most recent video streaming counters.
    #[must_use]
    pub fn latest_video_status(&self) -> Option<VideoStatus> {
        self.video_status
    }

    /// Abandons in-flight photo and video transfers.
    pub fn reset_transfers(&mut self) {
        self.photo.reset();
        self.video.reset();
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::handlers::{FrameCodecError, ReassemblyError, TransferState};

    #[test]
    fn photo_frames_complete_through_router() {
        let mut handler = NotificationHandler::default();
        let started = handler
            .handle(EndpointId::PhotoData, &[0x00, 0x00, 0x01, 0xAA, 0xBB])
            .expect("first photo frame should route");
        assert_eq!(
            NotifyEvent::Transfer {
                channel: ChannelKind::Photo,
                event: TransferEvent::Started { total_bytes: 2 },
            },
            started
        );

        handler
            .handle(EndpointId::PhotoData, &[0x01, 0x00, 0x01, 0xCC])
            .expect("second photo frame should route");
        let completed = handler
            .handle(EndpointId::PhotoData, &[0xFF, 0xFF, 0x01])
            .expect("sentinel should route");

        assert_matches!(
            completed,
            NotifyEvent::Transfer {
                channel: ChannelKind::Photo,
                event: TransferEvent::Completed(photo),
            } if photo.bytes() == [0xAA, 0xBB, 0xCC] && photo.frame_count() == 2
        );
    }

    #[test]
    fn short_photo_packet_leaves_transfer_untouched() {
        let mut handler = NotificationHandler::default();
        handler
            .handle(EndpointId::PhotoData, &[0x00, 0x00, 0x01, 0xAA])
            .expect("photo frame should route");

        let result = handler.handle(EndpointId::PhotoData, &[0x01]);
        assert_matches!(
            result,
            Err(ProtocolError::FrameCodec(error)) if matches!(*error, FrameCodecError::TooShort { .. })
        );
        assert_eq!(TransferState::Receiving, handler.photo().state());
        assert_eq!(1, handler.photo().buffered_len());
    }

    #[test]
    fn idle_sentinel_is_reported_as_ignored() {
        let mut handler = NotificationHandler::default();
        let event = handler
            .handle(EndpointId::VideoData, &[0xFF, 0xFF, 0x02])
            .expect("idle sentinel should route");
        assert_eq!(
            NotifyEvent::TransferIgnored {
                channel: ChannelKind::Video
            },
            event
        );
    }

    #[test]
    fn photo_kind_on_video_channel_is_a_mismatch() {
        let mut handler = NotificationHandler::default();
        let result = handler.handle(EndpointId::VideoData, &[0x00, 0x00, 0x01, 0xAA]);
        assert_matches!(
            result,
            Err(ProtocolError::Reassembly(error))
                if matches!(*error, ReassemblyError::KindMismatch { expected: 0x02, actual: 0x01 })
        );
    }

    #[test]
    fn sentinel_kind_does_not_discard_received_photo() {
        let mut handler = NotificationHandler::default();
        handler
            .handle(EndpointId::PhotoData, &[0x00, 0x00, 0x01, 0xAA, 0xBB])
            .expect("first photo frame should route");
        handler
            .handle(EndpointId::PhotoData, &[0x01, 0x00, 0x01, 0xCC])
            .expect("second photo frame should route");

        let completed = handler
            .handle(EndpointId::PhotoData, &[0xFF, 0xFF, 0x02])
            .expect("sentinel with a streaming kind should still route");

        assert_matches!(
            completed,
            NotifyEvent::Transfer {
                channel: ChannelKind::Photo,
                event: TransferEvent::Completed(photo),
            } if photo.bytes() == [0xAA, 0xBB, 0xCC] && photo.sentinel_kind() == Some(0x02)
        );
        assert_eq!(TransferState::Complete, handler.photo().state());
    }

    #[test]
    fn video_frames_use_the_video_reassembler() {
        let mut handler = NotificationHandler::default();
        handler
            .handle(EndpointId::VideoData, &[0x00, 0x00, 0x02, 0x20])
            .expect("video frame should route");

        assert_eq!(TransferState::Receiving, handler.video().state());
        assert_eq!(TransferState::Idle, handler.photo().state());
    }

    #[test]
    fn channels_do_not_interfere() {
        let mut handler = NotificationHandler::default();
        handler
            .handle(EndpointId::PhotoData, &[0x00, 0x00, 0x01, 0x10])
            .expect("photo frame should route");
        handler
            .handle(EndpointId::VideoData, &[0x00, 0x00, 0x02, 0x20, 0x21])
            .expect("video frame should route");
        handler
            .handle(EndpointId::DeviceStatus, &[0x03])
            .expect("status should route");
        let _ = handler.handle(EndpointId::HotspotStatus, &[0x00]);

        assert_eq!(1, handler.photo().buffered_len());
        assert_eq!(2, handler.video().buffered_len());
        assert_eq!(&[DeviceStatus::Ready], handler.status().history());
        assert_eq!(None, handler.latest_hotspot());
    }

    #[test]
    fn audio_chunks_accumulate() {
        let mut handler = NotificationHandler::default();
        let event = handler
            .handle(EndpointId::AudioData, &[0xFF, 0xFF, 0x00, 0x01, 0x02])
            .expect("audio chunk with wrapped counter should route");
        assert_eq!(NotifyEvent::AudioChunk { total_bytes: 2 }, event);
        assert_eq!(1, handler.audio().chunk_count());
    }

    #[test]
    fn hotspot_snapshot_replaces_previous() {
        let mut handler = NotificationHandler::default();
        handler
            .handle(EndpointId::HotspotStatus, &[0x01, 0x00, 0x04, 0x01])
            .expect("first snapshot should decode");
        handler
            .handle(EndpointId::HotspotStatus, &[0x02, 0x01, 0x04])
            .expect("second snapshot should decode");

        let latest = handler.latest_hotspot().expect("snapshot should be kept");
        assert_eq!(2, latest.status_code);
        assert_eq!(None, latest.ble_connected);
    }

    #[rstest]
    #[case(EndpointId::PhotoControl)]
    #[case(EndpointId::AudioCodec)]
    fn control_endpoints_are_unrouted(#[case] endpoint: EndpointId) {
        let mut handler = NotificationHandler::default();
        let event = handler
            .handle(endpoint, &[0x01])
            .expect("unrouted payload should not fail");
        assert_eq!(NotifyEvent::Unrouted(vec![0x01]), event);
    }

    #[test]
    fn capped_transfers_reject_oversized_frames() {
        let mut handler = NotificationHandler::default().with_max_transfer_bytes(1);
        let result = handler.handle(EndpointId::PhotoData, &[0x00, 0x00, 0x01, 0xAA, 0xBB]);
        assert_matches!(result, Err(ProtocolError::Reassembly(_)));
        assert_eq!(TransferState::Idle, handler.photo().state());
    }
}
