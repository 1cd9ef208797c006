//! UDP sockets facing the protocol engine

use crate::error::BridgeError;
use log::{debug, info};
use shared::{encode_control, ControlMessage};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Owns the inbound event socket and the outbound control socket.
///
/// The inbound socket is bound to the configured event address. The
/// outbound socket uses an ephemeral local port and only ever sends to the
/// engine's fixed control address.
#[derive(Debug, Clone)]
pub struct DatagramEndpoint {
    inbound: Arc<UdpSocket>,
    outbound: Arc<UdpSocket>,
    control_addr: SocketAddr,
}

impl DatagramEndpoint {
    pub async fn bind(
        event_addr: SocketAddr,
        control_addr: SocketAddr,
    ) -> Result<Self, BridgeError> {
        let inbound = UdpSocket::bind(event_addr)
            .await
            .map_err(|source| BridgeError::Bind {
                addr: event_addr,
                source,
            })?;

        let outbound_addr = match control_addr.ip() {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let outbound = UdpSocket::bind(outbound_addr)
            .await
            .map_err(|source| BridgeError::Bind {
                addr: outbound_addr,
                source,
            })?;

        info!(
            "Listening for protocol events on udp://{}",
            inbound.local_addr()?
        );
        info!("Control commands go to udp://{}", control_addr);

        Ok(Self {
            inbound: Arc::new(inbound),
            outbound: Arc::new(outbound),
            control_addr,
        })
    }

    /// Waits for the next event datagram
    pub async fn recv(&self, buffer: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
        self.inbound.recv_from(buffer).await
    }

    /// Sends one control message; no acknowledgment is awaited
    pub async fn send_control(&self, message: &ControlMessage) -> Result<usize, BridgeError> {
        let data = encode_control(message)?;
        let sent = self.outbound.send_to(&data, self.control_addr).await?;
        debug!("Sent {:?} to {}", message, self.control_addr);
        Ok(sent)
    }

    pub fn event_addr(&self) -> std::io::Result<SocketAddr> {
        self.inbound.local_addr()
    }

    pub fn control_addr(&self) -> SocketAddr {
        self.control_addr
    }
}
