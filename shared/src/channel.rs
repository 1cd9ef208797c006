//! Publish/subscribe messages the bridge pushes to observers

use crate::error::CodecError;
use crate::event::{ProtocolEvent, WireEvent};
use serde::{Deserialize, Serialize};

/// One frame on the observer channel, tagged by `channel`.
///
/// `packet_event` carries the engine payload verbatim in `data`; the other
/// two channels are narrowed views emitted alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum ObserverMessage {
    #[serde(rename_all = "camelCase")]
    PacketEvent {
        relay_seq: u64,
        received_at_ms: u64,
        data: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    ProgressUpdate {
        received: u64,
        total: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
    },
    FileComplete { filename: String, size: u64 },
}

impl ObserverMessage {
    pub fn channel(&self) -> &'static str {
        match self {
            ObserverMessage::PacketEvent { .. } => "packet_event",
            ObserverMessage::ProgressUpdate { .. } => "progress_update",
            ObserverMessage::FileComplete { .. } => "file_complete",
        }
    }

    pub fn to_text(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_text(text: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Rebuilds the stamped event from a `packet_event` frame.
    ///
    /// Returns `Ok(None)` for the narrowed channels.
    pub fn into_protocol_event(self) -> Result<Option<ProtocolEvent>, CodecError> {
        match self {
            ObserverMessage::PacketEvent {
                relay_seq,
                received_at_ms,
                data,
            } => {
                let event: WireEvent = serde_json::from_value(data)?;
                Ok(Some(ProtocolEvent::new(relay_seq, received_at_ms, event)))
            }
            _ => Ok(None),
        }
    }
}
