//! Wire formats shared by the relay bridge and its observers

pub mod channel;
pub mod control;
pub mod error;
pub mod event;

pub use channel::ObserverMessage;
pub use control::{
    decode_command, decode_control, encode_control, ControlCommand, ControlMessage, ControlTarget,
};
pub use error::CodecError;
pub use event::{decode_event, encode_event, EventKind, ProtocolEvent, WireEvent};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const DEFAULT_EVENT_PORT: u16 = 5000;
pub const DEFAULT_CONTROL_PORT: u16 = 5001;
pub const DEFAULT_OBSERVER_PORT: u16 = 3000;

/// Largest UDP payload over IPv4, so no event datagram is ever truncated
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

pub const LOG_CAPACITY: usize = 50;
pub const THROUGHPUT_CAPACITY: usize = 21;
pub const ANIMATION_TTL: Duration = Duration::from_millis(700);

pub const DEFAULT_WINDOW_START: u64 = 0;
pub const DEFAULT_WINDOW_END: u64 = 4;

pub const MIN_WINDOW_SIZE: u32 = 1;
pub const MAX_WINDOW_SIZE: u32 = 500;
pub const MAX_LOSS_CHANCE: u32 = 100;

/// Path prefix under which completed transfers are served
pub const RECEIVED_PATH: &str = "/received";

// Current wall clock in milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
