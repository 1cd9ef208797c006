//! Bounded, insertion-ordered history of applied events

use serde::Serialize;
use shared::{EventKind, ProtocolEvent, WireEvent};
use std::collections::VecDeque;

/// An applied event with the relay's stamp attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub relay_seq: u64,
    pub received_at_ms: u64,
    pub kind: EventKind,
    pub event: WireEvent,
}

impl From<&ProtocolEvent> for LogEntry {
    fn from(event: &ProtocolEvent) -> Self {
        Self {
            relay_seq: event.relay_seq,
            received_at_ms: event.received_at_ms,
            kind: event.kind(),
            event: event.event.clone(),
        }
    }
}

/// Ring buffer keeping the newest `capacity` entries.
///
/// Eviction is silent; the bound only caps memory.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn oldest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
