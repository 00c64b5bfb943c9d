use serde::Serialize;
use strum_macros::{Display, EnumIter};
use thiserror::Error;
use tracing::instrument;

const SEQUENCE_LEN: usize = 2;
const KINDED_HEADER_LEN: usize = 3;
const END_SENTINEL_MARKER: [u8; 2] = [0xFF, 0xFF];

/// Sequence value reserved for the end-of-transfer sentinel.
pub const END_SENTINEL_SEQUENCE: u16 = u16::MAX;

/// Errors returned by frame encoding and decoding.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FrameCodecError {
    /// The packet is shorter than the channel's fixed header.
    #[error("{channel} packet is too short: expected at least {min_len} bytes, got {actual}")]
    TooShort {
        channel: ChannelKind,
        min_len: usize,
        actual: usize,
    },
    /// Sequence `0xFFFF` cannot be encoded as a data frame.
    #[error("sequence 0xFFFF is reserved for the end sentinel")]
    ReservedSequence,
}

/// Framed notification channels.
///
/// Each channel maps to one characteristic and carries a
/// `[sequence_lo, sequence_hi, kind]` header in front of its payload.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    #[strum(to_string = "photo")]
    Photo,
    #[strum(to_string = "video")]
    Video,
    #[strum(to_string = "audio")]
    Audio,
}

impl ChannelKind {
    /// Minimum packet length accepted by the codec.
    ///
    /// ```
    /// use openglass::ChannelKind;
    ///
    /// assert_eq!(2, ChannelKind::Photo.min_len());
    /// ```
    #[must_use]
    pub const fn min_len(self) -> usize {
        SEQUENCE_LEN
    }

    /// Returns whether `0xFF 0xFF` terminates a transfer on this channel.
    ///
    /// The audio frame counter is free-running and wraps through `0xFFFF`, so
    /// audio packets are never treated as sentinels.
    #[must_use]
    pub const fn has_end_sentinel(self) -> bool {
        matches!(self, Self::Photo | Self::Video)
    }
}

/// One decoded data frame borrowing its payload from the raw packet.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame<'a> {
    sequence: u16,
    kind: Option<u8>,
    payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Creates a frame from already-split fields.
    #[must_use]
    pub const fn new(sequence: u16, kind: Option<u8>, payload: &'a [u8]) -> Self {
        Self {
            sequence,
            kind,
            payload,
        }
    }

    /// Returns the little-endian sequence number.
    #[must_use]
    pub const fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Returns the sub-kind byte, absent on 2-byte packets.
    ///
    /// ```
    /// use openglass::{ChannelKind, DecodedFrame, FrameCodec};
    ///
    /// let decoded = FrameCodec::decode(ChannelKind::Video, &[0x07, 0x00, 0x02, 0xAA])?;
    /// let DecodedFrame::Data(frame) = decoded else { unreachable!() };
    /// assert_eq!(Some(0x02), frame.kind());
    /// # Ok::<(), openglass::FrameCodecError>(())
    /// ```
    #[must_use]
    pub const fn kind(&self) -> Option<u8> {
        self.kind
    }

    /// Returns the payload following the header.
    #[must_use]
    pub const fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

/// Result of decoding one packet from a framed channel.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DecodedFrame<'a> {
    /// A regular data frame.
    Data(Frame<'a>),
    /// The `0xFFFF` end-of-transfer marker with the terminated sub-kind.
    EndSentinel { kind: Option<u8> },
}

/// Encodes and decodes OpenGlass chunked-transfer frames.
pub struct FrameCodec;

impl FrameCodec {
    /// Decodes one raw packet received on `channel`.
    ///
    /// The sentinel test runs before the sequence number is interpreted, so
    /// `0xFFFF` never surfaces as a data sequence on photo or video channels.
    ///
    /// # Errors
    ///
    /// Returns [`FrameCodecError::TooShort`] when the packet is shorter than
    /// [`ChannelKind::min_len`].
    ///
    /// ```
    /// use openglass::{ChannelKind, DecodedFrame, FrameCodec};
    ///
    /// let decoded = FrameCodec::decode(ChannelKind::Photo, &[0xFF, 0xFF, 0x01])?;
    /// assert_eq!(DecodedFrame::EndSentinel { kind: Some(0x01) }, decoded);
    /// # Ok::<(), openglass::FrameCodecError>(())
    /// ```
    #[instrument(skip(raw), level = "trace", fields(%channel, raw_len = raw.len()))]
    pub fn decode(channel: ChannelKind, raw: &[u8]) -> Result<DecodedFrame<'_>, FrameCodecError> {
        let min_len = channel.min_len();
        if raw.len() < min_len {
            return Err(FrameCodecError::TooShort {
                channel,
                min_len,
                actual: raw.len(),
            });
        }

        let kind = raw.get(SEQUENCE_LEN).copied();
        if channel.has_end_sentinel() && raw[..SEQUENCE_LEN] == END_SENTINEL_MARKER {
            return Ok(DecodedFrame::EndSentinel { kind });
        }

        let sequence = u16::from_le_bytes([raw[0], raw[1]]);
        let payload = raw.get(KINDED_HEADER_LEN..).unwrap_or_default();
        Ok(DecodedFrame::Data(Frame {
            sequence,
            kind,
            payload,
        }))
    }

    /// Encodes a data frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameCodecError::ReservedSequence`] for sequence `0xFFFF`.
    ///
    /// ```
    /// use openglass::FrameCodec;
    ///
    /// let frame = FrameCodec::encode_frame(0x0102, 0x01, &[0xAA])?;
    /// assert_eq!(vec![0x02, 0x01, 0x01, 0xAA], frame);
    /// # Ok::<(), openglass::FrameCodecError>(())
    /// ```
    pub fn encode_frame(sequence: u16, kind: u8, payload: &[u8]) -> Result<Vec<u8>, FrameCodecError> {
        if sequence == END_SENTINEL_SEQUENCE {
            return Err(FrameCodecError::ReservedSequence);
        }

        let mut frame = Vec::with_capacity(KINDED_HEADER_LEN + payload.len());
        frame.extend_from_slice(&sequence.to_le_bytes());
        frame.push(kind);
        frame.extend_from_slice(payload);
        Ok(frame)
    }

    /// Encodes the end sentinel for a transfer of `kind`.
    ///
    /// ```
    /// use openglass::FrameCodec;
    ///
    /// assert_eq!([0xFF, 0xFF, 0x02], FrameCodec::encode_end_sentinel(0x02));
    /// ```
    #[must_use]
    pub const fn encode_end_sentinel(kind: u8) -> [u8; 3] {
        [END_SENTINEL_MARKER[0], END_SENTINEL_MARKER[1], kind]
    }
}
