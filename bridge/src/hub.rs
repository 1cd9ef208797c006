//! Observer session registry and event fan-out
//!
//! This module tracks every connected observer and delivers relayed events
//! to all of them:
//! - Session lifecycle (connect, disconnect)
//! - Per-session bounded outbound queues
//! - Non-blocking fan-out that isolates slow or dead observers
//!
//! The hub never awaits a write. Each session has its own queue drained by
//! a writer task, so a stalled observer only loses its own frames.

use log::{debug, info, warn};
use shared::ObserverMessage;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message;

/// A connected observer
#[derive(Debug)]
pub struct Session {
    /// Identifier assigned by the hub
    pub id: u32,
    /// Remote address of the observer's connection
    pub addr: SocketAddr,
    /// When the session was registered
    pub connected_at: Instant,
    sender: mpsc::Sender<Message>,
}

impl Session {
    fn new(id: u32, addr: SocketAddr, sender: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Queues a frame without waiting. Returns false if it was dropped.
    fn offer(&self, frame: Message) -> bool {
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Session {} is not keeping up, dropping frame", self.id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Session {} queue closed, dropping frame", self.id);
                false
            }
        }
    }
}

/// Set of active observer sessions
pub struct BroadcastHub {
    sessions: HashMap<u32, Session>,
    next_session_id: u32,
    max_sessions: usize,
    session_queue: usize,
}

impl BroadcastHub {
    pub fn new(max_sessions: usize, session_queue: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            next_session_id: 1,
            max_sessions,
            session_queue,
        }
    }

    /// Registers a new observer.
    ///
    /// Returns the session id and the receiving half of its outbound queue,
    /// or None when the hub is at capacity.
    pub fn add_session(&mut self, addr: SocketAddr) -> Option<(u32, mpsc::Receiver<Message>)> {
        if self.sessions.len() >= self.max_sessions {
            return None;
        }

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let (sender, receiver) = mpsc::channel(self.session_queue);
        info!("Observer {} connected from {}", session_id, addr);
        self.sessions
            .insert(session_id, Session::new(session_id, addr, sender));

        Some((session_id, receiver))
    }

    /// Forgets a session. Dropping its sender ends the writer task.
    pub fn remove_session(&mut self, session_id: u32) -> bool {
        if let Some(session) = self.sessions.remove(&session_id) {
            info!(
                "Observer {} disconnected after {:.1}s",
                session.id,
                session.connected_at.elapsed().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    /// Queues a message for every session and returns how many accepted it
    pub fn broadcast(&self, message: &ObserverMessage) -> usize {
        if self.sessions.is_empty() {
            return 0;
        }

        let text = match message.to_text() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode {} frame: {}", message.channel(), e);
                return 0;
            }
        };

        self.sessions
            .values()
            .filter(|session| session.offer(Message::Text(text.clone())))
            .count()
    }

    pub fn session_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn session_addr(&self, session_id: u32) -> Option<SocketAddr> {
        self.sessions.get(&session_id).map(|session| session.addr)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
