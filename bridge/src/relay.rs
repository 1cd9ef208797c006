//! Relay bridge: protocol events in over UDP, observer frames out over WebSocket

use crate::config::BridgeConfig;
use crate::datagram::DatagramEndpoint;
use crate::error::BridgeError;
use crate::hub::BroadcastHub;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{
    decode_command, decode_event, now_millis, CodecError, ControlCommand, ControlMessage,
    ObserverMessage, ProtocolEvent, WireEvent, MAX_DATAGRAM_SIZE,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Control command submitted by a specific observer session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCommand {
    pub session_id: u32,
    pub command: ControlCommand,
}

/// The relay service: owns its sockets, the observer listener and the
/// session set. Nothing else is shared across requests.
pub struct RelayBridge {
    endpoint: DatagramEndpoint,
    listener: Option<TcpListener>,
    hub: Arc<RwLock<BroadcastHub>>,

    // Logical clock, advanced only by the inbound loop
    relay_seq: u64,

    control_tx: mpsc::UnboundedSender<SessionCommand>,
    control_rx: mpsc::UnboundedReceiver<SessionCommand>,
}

impl RelayBridge {
    /// Binds every socket the bridge needs. Any failure here is fatal.
    pub async fn bind(config: &BridgeConfig) -> Result<Self, BridgeError> {
        config.validate()?;

        let endpoint = DatagramEndpoint::bind(config.event_addr, config.control_addr).await?;

        let listener = TcpListener::bind(config.observer_addr)
            .await
            .map_err(|source| BridgeError::Bind {
                addr: config.observer_addr,
                source,
            })?;
        info!("Accepting observers on ws://{}", listener.local_addr()?);

        let (control_tx, control_rx) = mpsc::unbounded_channel();

        Ok(Self {
            endpoint,
            listener: Some(listener),
            hub: Arc::new(RwLock::new(BroadcastHub::new(
                config.max_sessions,
                config.session_queue,
            ))),
            relay_seq: 0,
            control_tx,
            control_rx,
        })
    }

    pub fn event_addr(&self) -> std::io::Result<SocketAddr> {
        self.endpoint.event_addr()
    }

    /// Address observers connect to. Unavailable once `run` has taken the
    /// listener.
    pub fn observer_addr(&self) -> std::io::Result<SocketAddr> {
        match &self.listener {
            Some(listener) => listener.local_addr(),
            None => Err(std::io::ErrorKind::NotConnected.into()),
        }
    }

    pub fn hub(&self) -> Arc<RwLock<BroadcastHub>> {
        Arc::clone(&self.hub)
    }

    /// Handles one inbound datagram.
    ///
    /// Malformed payloads are logged and dropped without reaching any
    /// observer. Well-formed ones are stamped with the next relay sequence
    /// number and fanned out.
    pub async fn on_event(&mut self, payload: &[u8], sender: SocketAddr) -> Option<ProtocolEvent> {
        let (event, raw) = match decode_datagram(payload) {
            Ok(decoded) => decoded,
            Err(_) if is_end_of_transfer_ack(payload) => {
                debug!("Dropping end-of-transfer ack from {}", sender);
                return None;
            }
            Err(e) => {
                warn!("Dropping malformed datagram from {}: {}", sender, e);
                return None;
            }
        };

        self.relay_seq += 1;
        let stamped = ProtocolEvent::new(self.relay_seq, now_millis(), event);
        debug!(
            "[engine {} -> bridge] #{} {}",
            sender,
            stamped.relay_seq,
            stamped.kind()
        );

        let messages = relay_messages(&stamped, raw);
        let hub = self.hub.read().await;
        for message in &messages {
            hub.broadcast(message);
        }

        Some(stamped)
    }

    /// Forwards an observer's control command to the protocol engine
    pub async fn on_control_command(
        &self,
        session_id: u32,
        command: ControlCommand,
    ) -> Result<(), BridgeError> {
        forward_control(&self.endpoint, session_id, command).await
    }

    /// Runs the bridge until the inbound socket fails.
    ///
    /// Observer sessions and control forwarding run on their own tasks; the
    /// inbound loop stays sequential so relay sequence numbers follow
    /// receipt order.
    pub async fn run(mut self) -> Result<(), BridgeError> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| BridgeError::Config("bridge is already running".into()))?;
        let control_rx = std::mem::replace(&mut self.control_rx, mpsc::unbounded_channel().1);

        let acceptor = spawn_observer_acceptor(
            listener,
            Arc::clone(&self.hub),
            self.control_tx.clone(),
        );
        let forwarder = spawn_control_forwarder(self.endpoint.clone(), control_rx);

        info!("Relay bridge started");

        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        let result = loop {
            match self.endpoint.recv(&mut buffer).await {
                Ok((len, sender)) => {
                    self.on_event(&buffer[..len], sender).await;
                }
                Err(e) => {
                    error!("Inbound event socket failed, closing it: {}", e);
                    break Err(BridgeError::Io(e));
                }
            }
        };

        acceptor.abort();
        forwarder.abort();
        result
    }
}

/// Decodes a datagram into the typed event plus its payload verbatim
fn decode_datagram(payload: &[u8]) -> Result<(WireEvent, serde_json::Value), CodecError> {
    let event = decode_event(payload)?;
    let raw = serde_json::from_slice(payload)?;
    Ok((event, raw))
}

/// The engine closes every transfer with `ACK_RECEIVED` for ack -1. It has
/// no sequence number to show, so it is dropped without a warning.
fn is_end_of_transfer_ack(payload: &[u8]) -> bool {
    match serde_json::from_slice::<serde_json::Value>(payload) {
        Ok(value) => value["event"] == "ACK_RECEIVED" && value["ack"] == -1,
        Err(_) => false,
    }
}

/// Builds every observer frame a stamped event produces.
///
/// The raw `packet_event` frame is always first. PROGRESS_UPDATE and
/// FILE_COMPLETE additionally produce their narrowed channel frames.
pub fn relay_messages(event: &ProtocolEvent, raw: serde_json::Value) -> Vec<ObserverMessage> {
    let mut messages = vec![ObserverMessage::PacketEvent {
        relay_seq: event.relay_seq,
        received_at_ms: event.received_at_ms,
        data: raw,
    }];

    match &event.event {
        WireEvent::ProgressUpdate {
            received,
            total,
            file_name,
            ..
        } => messages.push(ObserverMessage::ProgressUpdate {
            received: *received,
            total: *total,
            file_name: file_name.clone(),
        }),
        WireEvent::FileComplete { filename, size } => {
            info!("File complete: {} ({} bytes)", filename, size);
            messages.push(ObserverMessage::FileComplete {
                filename: filename.clone(),
                size: *size,
            });
        }
        _ => {}
    }

    messages
}

async fn forward_control(
    endpoint: &DatagramEndpoint,
    session_id: u32,
    command: ControlCommand,
) -> Result<(), BridgeError> {
    let message = ControlMessage::from(command);
    info!("Observer {} -> engine: {:?}", session_id, message);
    endpoint.send_control(&message).await?;
    Ok(())
}

fn spawn_control_forwarder(
    endpoint: DatagramEndpoint,
    mut control_rx: mpsc::UnboundedReceiver<SessionCommand>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(SessionCommand {
            session_id,
            command,
        }) = control_rx.recv().await
        {
            if let Err(e) = forward_control(&endpoint, session_id, command).await {
                error!("Failed to send control command to engine: {}", e);
            }
        }
    })
}

fn spawn_observer_acceptor(
    listener: TcpListener,
    hub: Arc<RwLock<BroadcastHub>>,
    control_tx: mpsc::UnboundedSender<SessionCommand>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    tokio::spawn(handle_session(
                        stream,
                        addr,
                        Arc::clone(&hub),
                        control_tx.clone(),
                    ));
                }
                Err(e) => {
                    error!("Failed to accept observer connection: {}", e);
                }
            }
        }
    })
}

/// Serves one observer from handshake to disconnect
async fn handle_session(
    stream: TcpStream,
    addr: SocketAddr,
    hub: Arc<RwLock<BroadcastHub>>,
    control_tx: mpsc::UnboundedSender<SessionCommand>,
) {
    let mut ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };

    let registration = hub.write().await.add_session(addr);
    let Some((session_id, mut outbound)) = registration else {
        warn!("Rejecting observer {}: session limit reached", addr);
        let _ = ws.close(None).await;
        return;
    };

    let (mut sink, mut inbound) = ws.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = sink.send(frame).await {
                debug!("Write to observer {} failed: {}", session_id, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = inbound.next().await {
        match frame {
            Ok(Message::Text(text)) => match decode_command(&text) {
                Ok(command) => {
                    if control_tx
                        .send(SessionCommand {
                            session_id,
                            command,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => warn!(
                    "Ignoring malformed control command from observer {}: {}",
                    session_id, e
                ),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Observer {} connection error: {}", session_id, e);
                break;
            }
        }
    }

    hub.write().await.remove_session(session_id);
    writer.abort();
}
