//! Runtime configuration for the relay bridge

use crate::error::BridgeError;
use shared::{DEFAULT_CONTROL_PORT, DEFAULT_EVENT_PORT, DEFAULT_OBSERVER_PORT};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Addresses and limits the bridge is started with
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Where protocol events arrive over UDP
    pub event_addr: SocketAddr,
    /// Fixed control address of the protocol engine
    pub control_addr: SocketAddr,
    /// Where observers open their WebSocket sessions
    pub observer_addr: SocketAddr,
    /// Maximum number of concurrent observer sessions
    pub max_sessions: usize,
    /// Outbound frames buffered per session before drops start
    pub session_queue: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let any = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);

        Self {
            event_addr: SocketAddr::new(any, DEFAULT_EVENT_PORT),
            control_addr: SocketAddr::new(localhost, DEFAULT_CONTROL_PORT),
            observer_addr: SocketAddr::new(any, DEFAULT_OBSERVER_PORT),
            max_sessions: 64,
            session_queue: 256,
        }
    }
}

impl BridgeConfig {
    /// Rejects configurations the bridge cannot run with.
    ///
    /// Port 0 on the event socket is allowed (ephemeral bind, used in tests),
    /// but a fixed event port must differ from the control port.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.event_addr.port() != 0 && self.event_addr.port() == self.control_addr.port() {
            return Err(BridgeError::Config(format!(
                "event port and control port must differ (both {})",
                self.event_addr.port()
            )));
        }
        if self.control_addr.port() == 0 {
            return Err(BridgeError::Config("control port must be fixed".into()));
        }
        if self.max_sessions == 0 {
            return Err(BridgeError::Config("max_sessions must be at least 1".into()));
        }
        if self.session_queue == 0 {
            return Err(BridgeError::Config("session_queue must be at least 1".into()));
        }
        Ok(())
    }
}
