use serde::Serialize;
use strum_macros::Display;
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

use super::frame_codec::{END_SENTINEL_SEQUENCE, Frame};

/// Application-level transfer sub-kinds carried in the third header byte.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    /// Still photo transfer (`0x01`).
    #[strum(to_string = "photo")]
    Photo,
    /// Video streaming frame transfer (`0x02`).
    #[strum(to_string = "streaming")]
    Streaming,
}

impl TransferKind {
    /// Returns the wire byte for this sub-kind.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Photo => 0x01,
            Self::Streaming => 0x02,
        }
    }
}

/// Lifecycle state of the transfer owned by a reassembler.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    #[strum(to_string = "idle")]
    Idle,
    #[strum(to_string = "receiving")]
    Receiving,
    #[strum(to_string = "complete")]
    Complete,
}

/// Errors returned by [`TransferReassembler::on_frame`].
///
/// Both variants abort the in-flight transfer before they are returned.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ReassemblyError {
    #[error("transfer sub-kind changed mid-transfer: expected 0x{expected:02X}, got 0x{actual:02X}")]
    KindMismatch { expected: u8, actual: u8 },
    #[error("transfer would grow to {attempted} bytes, above the {limit} byte limit")]
    BufferLimitExceeded { limit: usize, attempted: usize },
}

/// One fully received transfer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CompletedTransfer {
    bytes: Vec<u8>,
    frame_count: usize,
    kind: Option<u8>,
    sentinel_kind: Option<u8>,
    sequence_gaps: usize,
}

impl CompletedTransfer {
    /// Returns the concatenated payload bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the transfer and returns the payload bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Returns the number of payload bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns whether every frame carried an empty payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the number of data frames that made up the transfer.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Returns the sub-kind the transfer was bound to, if any frame carried one.
    #[must_use]
    pub fn kind(&self) -> Option<u8> {
        self.kind
    }

    /// Returns the sub-kind byte carried by the closing end sentinel.
    ///
    /// Informational only; it may differ from [`CompletedTransfer::kind`].
    #[must_use]
    pub fn sentinel_kind(&self) -> Option<u8> {
        self.sentinel_kind
    }

    /// Returns how many frames did not follow their predecessor's sequence.
    ///
    /// Diagnostic only; gaps never fail a transfer.
    #[must_use]
    pub fn sequence_gaps(&self) -> usize {
        self.sequence_gaps
    }
}

/// Event emitted for each frame or sentinel a reassembler accepts.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TransferEvent {
    /// First frame of a new transfer.
    Started { total_bytes: usize },
    /// Subsequent frame appended to the current transfer.
    Appended { total_bytes: usize },
    /// End sentinel closed the current transfer.
    Completed(CompletedTransfer),
}

/// Reassembles one logical channel's chunked transfers.
///
/// Frames are appended in arrival order. The transfer completes on an end
/// sentinel and is handed to the caller by value, leaving the internal buffer
/// empty.
#[derive(Debug, Clone)]
pub struct TransferReassembler {
    expected_kind: Option<TransferKind>,
    max_bytes: Option<usize>,
    state: TransferState,
    buffer: Vec<u8>,
    frame_count: usize,
    bound_kind: Option<u8>,
    last_sequence: Option<u16>,
    sequence_gaps: usize,
}

impl TransferReassembler {
    /// Creates a reassembler that only accepts frames of `kind`.
    #[must_use]
    pub fn new(kind: TransferKind) -> Self {
        Self::with_expected_kind(Some(kind))
    }

    /// Creates a reassembler that binds to the first sub-kind it sees.
    #[must_use]
    pub fn accepting_any_kind() -> Self {
        Self::with_expected_kind(None)
    }

    fn with_expected_kind(expected_kind: Option<TransferKind>) -> Self {
        Self {
            expected_kind,
            max_bytes: None,
            state: TransferState::Idle,
            buffer: Vec::new(),
            frame_count: 0,
            bound_kind: None,
            last_sequence: None,
            sequence_gaps: 0,
        }
    }

    /// Caps the buffered payload size of a single transfer.
    ///
    /// ```
    /// use openglass::{Frame, ReassemblyError, TransferKind, TransferReassembler};
    ///
    /// let mut photo = TransferReassembler::new(TransferKind::Photo).with_max_bytes(2);
    /// let result = photo.on_frame(&Frame::new(0, Some(0x01), &[1, 2, 3]));
    /// assert!(matches!(result, Err(ReassemblyError::BufferLimitExceeded { .. })));
    /// ```
    #[must_use]
    pub fn with_max_bytes(mut self, limit: usize) -> Self {
        self.max_bytes = Some(limit);
        self
    }

    /// Returns the current transfer state.
    #[must_use]
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Returns the number of frames in the current transfer.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Returns the number of payload bytes buffered so far.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the sub-kind this reassembler is configured for.
    #[must_use]
    pub fn expected_kind(&self) -> Option<TransferKind> {
        self.expected_kind
    }

    /// Appends one data frame.
    ///
    /// A frame arriving after completion starts a new transfer.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::KindMismatch`] when the frame's sub-kind
    /// differs from the bound kind, and
    /// [`ReassemblyError::BufferLimitExceeded`] when the payload would exceed
    /// the configured cap. Either error resets the transfer to idle.
    #[instrument(
        skip(self, frame),
        level = "trace",
        fields(state = %self.state, sequence = frame.sequence(), payload_len = frame.payload().len())
    )]
    pub fn on_frame(&mut self, frame: &Frame<'_>) -> Result<TransferEvent, ReassemblyError> {
        if self.state == TransferState::Complete {
            self.reset();
        }

        if let (Some(expected), Some(actual)) = (self.bound_or_expected_kind(), frame.kind())
            && expected != actual
        {
            warn!(
                expected,
                actual,
                frames = self.frame_count,
                "sub-kind mismatch, aborting transfer"
            );
            self.reset();
            return Err(ReassemblyError::KindMismatch { expected, actual });
        }

        let attempted = self.buffer.len().saturating_add(frame.payload().len());
        if let Some(limit) = self.max_bytes
            && attempted > limit
        {
            warn!(limit, attempted, "transfer exceeds buffer limit, aborting");
            self.reset();
            return Err(ReassemblyError::BufferLimitExceeded { limit, attempted });
        }

        if self.bound_kind.is_none() {
            self.bound_kind = self.expected_kind.map(TransferKind::code).or(frame.kind());
        }

        let started = self.state == TransferState::Idle;
        if started {
            self.state = TransferState::Receiving;
            self.buffer.clear();
        } else if let Some(previous) = self.last_sequence
            && frame.sequence() != next_sequence(previous)
        {
            trace!(previous, current = frame.sequence(), "sequence gap");
            self.sequence_gaps += 1;
        }

        self.buffer.extend_from_slice(frame.payload());
        self.frame_count += 1;
        self.last_sequence = Some(frame.sequence());

        let total_bytes = self.buffer.len();
        if started {
            debug!(total_bytes, "transfer started");
            Ok(TransferEvent::Started { total_bytes })
        } else {
            Ok(TransferEvent::Appended { total_bytes })
        }
    }

    /// Closes the in-flight transfer on an end sentinel.
    ///
    /// The sentinel's sub-kind byte is only reported: a transfer completes
    /// whatever kind the sentinel carries. Returns `None` when no transfer is
    /// in flight; such sentinels are echoes between transfers.
    ///
    /// ```
    /// use openglass::{Frame, TransferKind, TransferReassembler};
    ///
    /// let mut photo = TransferReassembler::new(TransferKind::Photo);
    /// photo.on_frame(&Frame::new(0, Some(0x01), &[0xAA]))?;
    /// let completed = photo.on_end_sentinel(Some(0x02)).expect("transfer in flight");
    /// assert_eq!(&[0xAA], completed.bytes());
    /// assert_eq!(Some(0x02), completed.sentinel_kind());
    /// # Ok::<(), openglass::ReassemblyError>(())
    /// ```
    #[instrument(skip(self), level = "trace", fields(state = %self.state))]
    pub fn on_end_sentinel(&mut self, kind: Option<u8>) -> Option<CompletedTransfer> {
        if self.state != TransferState::Receiving {
            debug!("end sentinel with no transfer in flight, ignoring");
            return None;
        }

        if let (Some(expected), Some(actual)) = (self.bound_or_expected_kind(), kind)
            && expected != actual
        {
            warn!(expected, actual, "end sentinel carries a different sub-kind");
        }

        let completed = CompletedTransfer {
            bytes: std::mem::take(&mut self.buffer),
            frame_count: self.frame_count,
            kind: self.bound_kind,
            sentinel_kind: kind,
            sequence_gaps: self.sequence_gaps,
        };
        self.state = TransferState::Complete;
        debug!(
            total_bytes = completed.len(),
            frames = completed.frame_count(),
            gaps = completed.sequence_gaps(),
            "transfer complete"
        );
        Some(completed)
    }

    /// Drops any partial transfer and returns to idle. Idempotent.
    pub fn reset(&mut self) {
        self.state = TransferState::Idle;
        self.buffer.clear();
        self.frame_count = 0;
        self.bound_kind = None;
        self.last_sequence = None;
        self.sequence_gaps = 0;
    }

    fn bound_or_expected_kind(&self) -> Option<u8> {
        self.expected_kind.map(TransferKind::code).or(self.bound_kind)
    }
}

/// Sequence expected after `previous`; `0xFFFF` is reserved for the sentinel.
fn next_sequence(previous: u16) -> u16 {
    match previous.wrapping_add(1) {
        END_SENTINEL_SEQUENCE => 0,
        next => next,
    }
}
