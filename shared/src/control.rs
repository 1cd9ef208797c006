//! Control commands flowing from observers back to the protocol engine

use crate::error::CodecError;
use serde::{Deserialize, Serialize};

/// Setting an observer asks the protocol engine to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlTarget {
    WindowSize,
    LossChance,
}

/// Control request as submitted by an observer session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub target: ControlTarget,
    pub value: u32,
}

impl ControlCommand {
    pub fn window_size(size: u32) -> Self {
        Self {
            target: ControlTarget::WindowSize,
            value: size,
        }
    }

    pub fn loss_chance(chance: u32) -> Self {
        Self {
            target: ControlTarget::LossChance,
            value: chance,
        }
    }
}

/// Control datagram understood by the protocol engine's control port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ControlMessage {
    #[serde(rename = "SET_WINDOW")]
    SetWindow { size: u32 },
    #[serde(rename = "SET_LOSS")]
    SetLoss { chance: u32 },
}

impl From<ControlCommand> for ControlMessage {
    fn from(command: ControlCommand) -> Self {
        match command.target {
            ControlTarget::WindowSize => ControlMessage::SetWindow {
                size: command.value,
            },
            ControlTarget::LossChance => ControlMessage::SetLoss {
                chance: command.value,
            },
        }
    }
}

pub fn encode_control(message: &ControlMessage) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode_control(payload: &[u8]) -> Result<ControlMessage, CodecError> {
    let text = std::str::from_utf8(payload)?;
    Ok(serde_json::from_str(text.trim())?)
}

pub fn decode_command(text: &str) -> Result<ControlCommand, CodecError> {
    Ok(serde_json::from_str(text)?)
}
