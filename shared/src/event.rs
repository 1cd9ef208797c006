//! Wire event schema emitted by the protocol engine

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One protocol occurrence as carried in a datagram payload.
///
/// The `event` field selects the variant. Any extra fields the engine adds
/// (such as its own `timestamp`) are ignored unless modelled here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireEvent {
    #[serde(rename_all = "camelCase")]
    PacketSent {
        seq: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_start: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_end: Option<u64>,
    },
    PacketReceived {
        seq: u64,
    },
    AckSent {
        ack: u64,
    },
    AckReceived {
        ack: u64,
    },
    Timeout {
        seq: u64,
    },
    Retransmit {
        seq: u64,
    },
    #[serde(rename_all = "camelCase")]
    WindowMoved {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old_start: Option<u64>,
        new_start: u64,
        new_end: u64,
    },
    #[serde(rename_all = "camelCase")]
    ProgressUpdate {
        received: u64,
        total: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
    FileComplete {
        filename: String,
        size: u64,
    },
}

/// Discriminant of a [`WireEvent`], used for logging and dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    PacketSent,
    PacketReceived,
    AckSent,
    AckReceived,
    Timeout,
    Retransmit,
    WindowMoved,
    ProgressUpdate,
    FileComplete,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PacketSent => "PACKET_SENT",
            EventKind::PacketReceived => "PACKET_RECEIVED",
            EventKind::AckSent => "ACK_SENT",
            EventKind::AckReceived => "ACK_RECEIVED",
            EventKind::Timeout => "TIMEOUT",
            EventKind::Retransmit => "RETRANSMIT",
            EventKind::WindowMoved => "WINDOW_MOVED",
            EventKind::ProgressUpdate => "PROGRESS_UPDATE",
            EventKind::FileComplete => "FILE_COMPLETE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WireEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WireEvent::PacketSent { .. } => EventKind::PacketSent,
            WireEvent::PacketReceived { .. } => EventKind::PacketReceived,
            WireEvent::AckSent { .. } => EventKind::AckSent,
            WireEvent::AckReceived { .. } => EventKind::AckReceived,
            WireEvent::Timeout { .. } => EventKind::Timeout,
            WireEvent::Retransmit { .. } => EventKind::Retransmit,
            WireEvent::WindowMoved { .. } => EventKind::WindowMoved,
            WireEvent::ProgressUpdate { .. } => EventKind::ProgressUpdate,
            WireEvent::FileComplete { .. } => EventKind::FileComplete,
        }
    }

    /// Sequence or acknowledgment number the event refers to, if any
    pub fn subject(&self) -> Option<u64> {
        match self {
            WireEvent::PacketSent { seq, .. }
            | WireEvent::PacketReceived { seq }
            | WireEvent::Timeout { seq }
            | WireEvent::Retransmit { seq } => Some(*seq),
            WireEvent::AckSent { ack } | WireEvent::AckReceived { ack } => Some(*ack),
            _ => None,
        }
    }

    /// Explicit window bounds carried by the event.
    ///
    /// PACKET_SENT only yields bounds when both `windowStart` and
    /// `windowEnd` are present.
    pub fn window_bounds(&self) -> Option<(u64, u64)> {
        match self {
            WireEvent::PacketSent {
                window_start: Some(start),
                window_end: Some(end),
                ..
            } => Some((*start, *end)),
            WireEvent::WindowMoved {
                new_start, new_end, ..
            } => Some((*new_start, *new_end)),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), CodecError> {
        if let Some((start, end)) = self.window_bounds() {
            if start > end {
                return Err(CodecError::InvalidWindow { start, end });
            }
        }
        Ok(())
    }
}

/// Decodes a datagram payload into a validated [`WireEvent`]
pub fn decode_event(payload: &[u8]) -> Result<WireEvent, CodecError> {
    let text = std::str::from_utf8(payload)?;
    let event: WireEvent = serde_json::from_str(text.trim())?;
    event.validate()?;
    Ok(event)
}

pub fn encode_event(event: &WireEvent) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(event)?)
}

/// An event as stamped by the relay on receipt.
///
/// `relay_seq` is the authoritative ordering clock; the engine's own
/// timestamps are never used for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolEvent {
    pub relay_seq: u64,
    pub received_at_ms: u64,
    pub event: WireEvent,
}

impl ProtocolEvent {
    pub fn new(relay_seq: u64, received_at_ms: u64, event: WireEvent) -> Self {
        Self {
            relay_seq,
            received_at_ms,
            event,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}
