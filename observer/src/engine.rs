//! Derived protocol state reconstructed from the relayed event stream
//!
//! The engine is a pure function of the events applied to it, in the order
//! they were delivered. It never reorders. Robustness against reordering
//! upstream comes from one rule: an ACKED packet is terminal, so stale
//! SENT/TIMEOUT/RETRANSMIT observations cannot downgrade it.

use crate::animation::{AnimationKind, AnimationTracker};
use crate::history::{EventLog, LogEntry};
use log::debug;
use serde::Serialize;
use shared::{
    ProtocolEvent, WireEvent, ANIMATION_TTL, DEFAULT_WINDOW_END, DEFAULT_WINDOW_START,
    LOG_CAPACITY, RECEIVED_PATH, THROUGHPUT_CAPACITY,
};
use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

/// Delivery status of one sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PacketStatus {
    Pending,
    Sent,
    Acked,
    Timeout,
    Retransmit,
}

/// Currently permitted unacknowledged-send range, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowState {
    pub start: u64,
    pub end: u64,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            start: DEFAULT_WINDOW_START,
            end: DEFAULT_WINDOW_END,
        }
    }
}

impl WindowState {
    /// Number of sequence numbers covered, saturating at `u64::MAX`
    pub fn width(&self) -> u64 {
        self.end.saturating_sub(self.start).saturating_add(1)
    }

    pub fn contains(&self, seq: u64) -> bool {
        seq >= self.start && seq <= self.end
    }
}

/// Cumulative counters. Only `reset` ever lowers them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub sent: u64,
    pub acked: u64,
    pub timeouts: u64,
    pub retransmits: u64,
}

/// Progress of the single active file transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferProgress {
    pub file_name: String,
    pub received_bytes: u64,
    pub total_bytes: u64,
    pub complete: bool,
}

impl TransferProgress {
    /// Whole percent received, capped at 100
    pub fn percent(&self) -> u64 {
        if self.total_bytes == 0 {
            return 0;
        }
        let percent = u128::from(self.received_bytes) * 100 / u128::from(self.total_bytes);
        percent.min(100) as u64
    }

    /// Where the completed file can be previewed, for image files only
    pub fn preview_path(&self) -> Option<String> {
        let lower = self.file_name.to_ascii_lowercase();
        let is_image = [".png", ".jpg", ".jpeg", ".gif"]
            .iter()
            .any(|ext| lower.ends_with(ext));

        if is_image {
            Some(format!("{}/{}", RECEIVED_PATH, self.file_name))
        } else {
            None
        }
    }
}

/// One ACK observation used for the throughput chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThroughputSample {
    pub ack: u64,
    pub relay_seq: u64,
    pub received_at_ms: u64,
}

/// Live marker as exposed to renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerView {
    pub seq: u64,
    pub kind: AnimationKind,
    pub remaining_ms: u64,
}

/// Everything a render step needs, detached from the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub packets: BTreeMap<u64, PacketStatus>,
    pub window: WindowState,
    pub pending_window_size: Option<u64>,
    pub metrics: Metrics,
    pub transfer: Option<TransferProgress>,
    pub log: Vec<LogEntry>,
    pub throughput: Vec<ThroughputSample>,
    pub acks_per_second: f64,
    pub animations: Vec<MarkerView>,
    pub paused: bool,
}

pub struct StateEngine {
    packets: BTreeMap<u64, PacketStatus>,
    window: WindowState,
    pending_window_size: Option<u64>,
    metrics: Metrics,
    transfer: Option<TransferProgress>,
    log: EventLog,
    throughput: VecDeque<ThroughputSample>,
    animations: AnimationTracker,
    paused: bool,
}

impl Default for StateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateEngine {
    pub fn new() -> Self {
        Self {
            packets: BTreeMap::new(),
            window: WindowState::default(),
            pending_window_size: None,
            metrics: Metrics::default(),
            transfer: None,
            log: EventLog::new(LOG_CAPACITY),
            throughput: VecDeque::with_capacity(THROUGHPUT_CAPACITY),
            animations: AnimationTracker::new(ANIMATION_TTL),
            paused: false,
        }
    }

    /// Applies one event using the current instant for animation expiry
    pub fn apply(&mut self, event: &ProtocolEvent) -> bool {
        self.apply_at(event, Instant::now())
    }

    /// Applies one event. Returns false if the engine is paused and the
    /// event was dropped.
    ///
    /// While paused nothing changes: no state, no log entry, no marker, and
    /// the event is not kept for later.
    pub fn apply_at(&mut self, event: &ProtocolEvent, now: Instant) -> bool {
        if self.paused {
            return false;
        }

        self.log.push(LogEntry::from(event));

        match &event.event {
            WireEvent::PacketSent { seq, .. } => {
                self.set_status(*seq, PacketStatus::Sent);
                if let Some((start, end)) = event.event.window_bounds() {
                    self.adopt_window(start, end);
                }
                self.metrics.sent += 1;
                self.animations.mark(*seq, AnimationKind::Fly, now);
            }
            WireEvent::AckReceived { ack } => {
                self.packets.insert(*ack, PacketStatus::Acked);
                self.metrics.acked += 1;
                self.record_throughput(*ack, event);
                self.animations.mark(*ack, AnimationKind::Blink, now);
            }
            WireEvent::Timeout { seq } => {
                // counted even when the packet is already ACKED
                self.set_status(*seq, PacketStatus::Timeout);
                self.metrics.timeouts += 1;
                self.animations.mark(*seq, AnimationKind::Shake, now);
            }
            WireEvent::Retransmit { seq } => {
                self.set_status(*seq, PacketStatus::Retransmit);
                self.metrics.retransmits += 1;
                self.animations.mark(*seq, AnimationKind::Bounce, now);
            }
            WireEvent::WindowMoved {
                new_start, new_end, ..
            } => {
                self.adopt_window(*new_start, *new_end);
            }
            WireEvent::ProgressUpdate {
                received,
                total,
                file_name,
                ..
            } => {
                self.update_progress(*received, *total, file_name.as_deref());
            }
            WireEvent::FileComplete { filename, size } => {
                self.transfer = Some(TransferProgress {
                    file_name: filename.clone(),
                    received_bytes: *size,
                    total_bytes: *size,
                    complete: true,
                });
            }
            WireEvent::PacketReceived { .. } | WireEvent::AckSent { .. } => {}
        }

        true
    }

    fn set_status(&mut self, seq: u64, status: PacketStatus) {
        let entry = self.packets.entry(seq).or_insert(PacketStatus::Pending);
        if *entry != PacketStatus::Acked {
            *entry = status;
        }
    }

    fn adopt_window(&mut self, start: u64, end: u64) {
        if start > end {
            debug!("Ignoring inverted window {}..{}", start, end);
            return;
        }

        self.window = WindowState { start, end };
        if self.pending_window_size == Some(self.window.width()) {
            self.pending_window_size = None;
        }
    }

    fn record_throughput(&mut self, ack: u64, event: &ProtocolEvent) {
        while self.throughput.len() >= THROUGHPUT_CAPACITY {
            self.throughput.pop_front();
        }
        self.throughput.push_back(ThroughputSample {
            ack,
            relay_seq: event.relay_seq,
            received_at_ms: event.received_at_ms,
        });
    }

    /// Last named transfer wins. Every update with a known total refreshes
    /// the record, and progress below the total reopens a completed one.
    fn update_progress(&mut self, received: u64, total: u64, file_name: Option<&str>) {
        if total == 0 {
            return;
        }

        let same_transfer = match (&self.transfer, file_name) {
            (Some(current), Some(name)) => current.file_name == name,
            (Some(_), None) => true,
            (None, _) => false,
        };

        match self.transfer.as_mut() {
            Some(current) if same_transfer => {
                current.received_bytes = received;
                current.total_bytes = total;
                if received < total {
                    current.complete = false;
                }
            }
            _ => {
                self.transfer = Some(TransferProgress {
                    file_name: file_name.unwrap_or_default().to_string(),
                    received_bytes: received,
                    total_bytes: total,
                    complete: false,
                });
            }
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Returns every piece of derived state to its initial value.
    ///
    /// Pause state and live markers are left alone; markers expire on their
    /// own.
    pub fn reset(&mut self) {
        self.packets.clear();
        self.window = WindowState::default();
        self.pending_window_size = None;
        self.metrics = Metrics::default();
        self.transfer = None;
        self.log.clear();
        self.throughput.clear();
    }

    /// Records that this observer asked the engine for a new window size
    pub fn note_window_request(&mut self, size: u64) {
        if size > 0 && size != self.window.width() {
            self.pending_window_size = Some(size);
        } else {
            self.pending_window_size = None;
        }
    }

    /// Whether the window width matches what was last requested
    pub fn window_settled(&self) -> bool {
        self.pending_window_size.is_none()
    }

    pub fn status_of(&self, seq: u64) -> PacketStatus {
        self.packets
            .get(&seq)
            .copied()
            .unwrap_or(PacketStatus::Pending)
    }

    pub fn packets(&self) -> &BTreeMap<u64, PacketStatus> {
        &self.packets
    }

    pub fn window(&self) -> WindowState {
        self.window
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn transfer(&self) -> Option<&TransferProgress> {
        self.transfer.as_ref()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn throughput(&self) -> impl Iterator<Item = &ThroughputSample> {
        self.throughput.iter()
    }

    pub fn animations(&self) -> &AnimationTracker {
        &self.animations
    }

    /// ACKs per second across the retained throughput samples
    pub fn acks_per_second(&self) -> f64 {
        let (Some(first), Some(last)) = (self.throughput.front(), self.throughput.back()) else {
            return 0.0;
        };

        let span_ms = last.received_at_ms.saturating_sub(first.received_at_ms);
        if span_ms == 0 {
            return 0.0;
        }

        (self.throughput.len() - 1) as f64 * 1000.0 / span_ms as f64
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> EngineSnapshot {
        EngineSnapshot {
            packets: self.packets.clone(),
            window: self.window,
            pending_window_size: self.pending_window_size,
            metrics: self.metrics,
            transfer: self.transfer.clone(),
            log: self.log.iter().cloned().collect(),
            throughput: self.throughput.iter().copied().collect(),
            acks_per_second: self.acks_per_second(),
            animations: self
                .animations
                .active(now)
                .map(|m| MarkerView {
                    seq: m.seq,
                    kind: m.kind,
                    remaining_ms: m.expires_at.saturating_duration_since(now).as_millis() as u64,
                })
                .collect(),
            paused: self.paused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use proptest::prelude::*;
    use std::time::Duration;

    struct Feed {
        engine: StateEngine,
        relay_seq: u64,
    }

    impl Feed {
        fn new() -> Self {
            Self {
                engine: StateEngine::new(),
                relay_seq: 0,
            }
        }

        fn push(&mut self, event: WireEvent) -> bool {
            self.relay_seq += 1;
            let stamped = ProtocolEvent::new(self.relay_seq, self.relay_seq * 100, event);
            self.engine.apply(&stamped)
        }
    }

    fn sent(seq: u64) -> WireEvent {
        WireEvent::PacketSent {
            seq,
            window_start: None,
            window_end: None,
        }
    }

    fn sent_in(seq: u64, start: u64, end: u64) -> WireEvent {
        WireEvent::PacketSent {
            seq,
            window_start: Some(start),
            window_end: Some(end),
        }
    }

    fn progress(received: u64, total: u64, name: Option<&str>) -> WireEvent {
        WireEvent::ProgressUpdate {
            received,
            total,
            file_name: name.map(str::to_string),
            timestamp: None,
        }
    }

    fn fresh_snapshot() -> String {
        let engine = StateEngine::new();
        serde_json::to_string(&engine.snapshot()).unwrap()
    }

    #[test]
    fn test_fresh_engine() {
        let engine = StateEngine::new();
        assert_eq!(engine.window(), WindowState { start: 0, end: 4 });
        assert_eq!(engine.metrics(), Metrics::default());
        assert_eq!(engine.status_of(0), PacketStatus::Pending);
        assert!(engine.transfer().is_none());
        assert!(engine.log().is_empty());
        assert!(!engine.is_paused());
    }

    #[test]
    fn test_sent_ack_then_stale_timeout() {
        let mut feed = Feed::new();

        feed.push(sent_in(3, 0, 4));
        assert_eq!(feed.engine.status_of(3), PacketStatus::Sent);
        assert_eq!(feed.engine.window(), WindowState { start: 0, end: 4 });

        feed.push(WireEvent::AckReceived { ack: 3 });
        assert_eq!(feed.engine.status_of(3), PacketStatus::Acked);
        assert_eq!(feed.engine.metrics().acked, 1);

        feed.push(WireEvent::Timeout { seq: 3 });
        assert_eq!(feed.engine.status_of(3), PacketStatus::Acked);
        assert_eq!(feed.engine.metrics().timeouts, 1);
    }

    #[test]
    fn test_full_retransmission_cycle() {
        let mut feed = Feed::new();

        feed.push(sent(1));
        feed.push(WireEvent::Timeout { seq: 1 });
        assert_eq!(feed.engine.status_of(1), PacketStatus::Timeout);

        feed.push(WireEvent::Retransmit { seq: 1 });
        assert_eq!(feed.engine.status_of(1), PacketStatus::Retransmit);

        feed.push(WireEvent::AckReceived { ack: 1 });
        assert_eq!(feed.engine.status_of(1), PacketStatus::Acked);

        assert_eq!(
            feed.engine.metrics(),
            Metrics {
                sent: 1,
                acked: 1,
                timeouts: 1,
                retransmits: 1,
            }
        );
    }

    #[test]
    fn test_ack_before_send_stays_acked() {
        let mut feed = Feed::new();

        feed.push(WireEvent::AckReceived { ack: 7 });
        feed.push(sent(7));
        feed.push(WireEvent::Retransmit { seq: 7 });

        assert_eq!(feed.engine.status_of(7), PacketStatus::Acked);
        assert_eq!(feed.engine.metrics().sent, 1);
        assert_eq!(feed.engine.metrics().retransmits, 1);
    }

    #[test]
    fn test_window_moved_and_partial_bounds() {
        let mut feed = Feed::new();

        feed.push(WireEvent::WindowMoved {
            old_start: Some(0),
            new_start: 2,
            new_end: 6,
        });
        assert_eq!(feed.engine.window(), WindowState { start: 2, end: 6 });

        feed.push(WireEvent::PacketSent {
            seq: 3,
            window_start: Some(9),
            window_end: None,
        });
        assert_eq!(feed.engine.window(), WindowState { start: 2, end: 6 });
        assert!(feed.engine.window().contains(6));
        assert!(!feed.engine.window().contains(7));
    }

    #[test]
    fn test_inverted_window_is_ignored() {
        let mut feed = Feed::new();
        feed.push(WireEvent::WindowMoved {
            old_start: None,
            new_start: 8,
            new_end: 2,
        });
        assert_eq!(feed.engine.window(), WindowState::default());
    }

    #[test]
    fn test_pending_window_request_settles() {
        let mut feed = Feed::new();

        feed.engine.note_window_request(8);
        assert!(!feed.engine.window_settled());

        feed.push(WireEvent::WindowMoved {
            old_start: None,
            new_start: 1,
            new_end: 5,
        });
        assert!(!feed.engine.window_settled());

        feed.push(sent_in(2, 1, 8));
        assert!(feed.engine.window_settled());
        assert_eq!(feed.engine.window().width(), 8);
    }

    #[test]
    fn test_full_range_window_does_not_overflow() {
        let mut feed = Feed::new();
        feed.engine.note_window_request(8);

        feed.push(WireEvent::WindowMoved {
            old_start: None,
            new_start: 0,
            new_end: u64::MAX,
        });

        assert_eq!(feed.engine.window().width(), u64::MAX);
        assert!(!feed.engine.window_settled());

        feed.engine.note_window_request(u64::MAX);
        assert!(feed.engine.window_settled());
    }

    #[test]
    fn test_window_request_matching_current_width() {
        let mut engine = StateEngine::new();
        engine.note_window_request(5);
        assert!(engine.window_settled());
    }

    #[test]
    fn test_progress_then_file_complete_reconciles() {
        let mut feed = Feed::new();

        feed.push(progress(512, 1024, Some("a.bin")));
        let transfer = feed.engine.transfer().unwrap();
        assert_eq!(transfer.percent(), 50);
        assert!(!transfer.complete);

        feed.push(WireEvent::FileComplete {
            filename: "a.bin".into(),
            size: 1024,
        });
        let transfer = feed.engine.transfer().unwrap();
        assert_eq!(transfer.received_bytes, 1024);
        assert_eq!(transfer.total_bytes, 1024);
        assert_eq!(transfer.percent(), 100);
        assert!(transfer.complete);
    }

    #[test]
    fn test_progress_with_zero_total_is_ignored() {
        let mut feed = Feed::new();
        feed.push(progress(10, 0, Some("a.bin")));
        assert!(feed.engine.transfer().is_none());
    }

    #[test]
    fn test_new_file_name_replaces_transfer() {
        let mut feed = Feed::new();

        feed.push(progress(900, 1000, Some("a.bin")));
        feed.push(progress(10, 400, Some("b.png")));

        let transfer = feed.engine.transfer().unwrap();
        assert_eq!(transfer.file_name, "b.png");
        assert_eq!(transfer.received_bytes, 10);
        assert_eq!(transfer.percent(), 2);
        assert_eq!(transfer.preview_path(), Some("/received/b.png".to_string()));
    }

    #[test]
    fn test_nameless_progress_updates_current_transfer() {
        let mut feed = Feed::new();

        feed.push(progress(100, 1000, None));
        feed.push(progress(333, 1000, None));

        let transfer = feed.engine.transfer().unwrap();
        assert_eq!(transfer.file_name, "");
        assert_eq!(transfer.percent(), 33);
        assert_eq!(transfer.preview_path(), None);
    }

    #[test]
    fn test_progress_after_file_complete_starts_over() {
        let mut feed = Feed::new();

        feed.push(WireEvent::FileComplete {
            filename: "a.bin".into(),
            size: 1024,
        });
        feed.push(progress(100, 2048, None));

        let transfer = feed.engine.transfer().unwrap();
        assert_eq!(transfer.received_bytes, 100);
        assert_eq!(transfer.total_bytes, 2048);
        assert_eq!(transfer.percent(), 4);
        assert!(!transfer.complete);
    }

    #[test]
    fn test_same_name_progress_reopens_completed_transfer() {
        let mut feed = Feed::new();

        feed.push(WireEvent::FileComplete {
            filename: "a.bin".into(),
            size: 1024,
        });
        feed.push(progress(512, 1024, Some("a.bin")));

        let transfer = feed.engine.transfer().unwrap();
        assert_eq!(transfer.file_name, "a.bin");
        assert_eq!(transfer.percent(), 50);
        assert!(!transfer.complete);

        feed.push(progress(1024, 1024, None));
        assert_eq!(feed.engine.transfer().unwrap().percent(), 100);
    }

    #[test]
    fn test_percent_is_floored_and_capped() {
        let transfer = TransferProgress {
            file_name: "x".into(),
            received_bytes: 2,
            total_bytes: 3,
            complete: false,
        };
        assert_eq!(transfer.percent(), 66);

        let overshoot = TransferProgress {
            received_bytes: 5,
            ..transfer.clone()
        };
        assert_eq!(overshoot.percent(), 100);

        let empty = TransferProgress {
            total_bytes: 0,
            ..transfer
        };
        assert_eq!(empty.percent(), 0);
    }

    #[test]
    fn test_preview_path_case_insensitive() {
        let transfer = TransferProgress {
            file_name: "Photo.JPEG".into(),
            received_bytes: 0,
            total_bytes: 1,
            complete: false,
        };
        assert_eq!(
            transfer.preview_path(),
            Some("/received/Photo.JPEG".to_string())
        );
    }

    #[test]
    fn test_receiver_side_events_only_logged() {
        let mut feed = Feed::new();
        let before = feed.engine.snapshot();

        feed.push(WireEvent::PacketReceived { seq: 1 });
        feed.push(WireEvent::AckSent { ack: 1 });

        let after = feed.engine.snapshot();
        assert_eq!(after.packets, before.packets);
        assert_eq!(after.metrics, before.metrics);
        assert_eq!(after.log.len(), 2);
    }

    #[test]
    fn test_pause_drops_events() {
        let mut feed = Feed::new();
        feed.push(sent(1));
        let now = Instant::now();

        feed.engine.pause();
        let before = serde_json::to_string(&feed.engine.snapshot_at(now)).unwrap();

        assert!(!feed.push(WireEvent::AckReceived { ack: 1 }));
        assert!(!feed.push(sent_in(2, 1, 5)));
        assert!(!feed.push(progress(1, 2, Some("a.bin"))));

        let after = serde_json::to_string(&feed.engine.snapshot_at(now)).unwrap();
        assert_eq!(before, after);

        // dropped, not queued
        feed.engine.resume();
        assert_eq!(feed.engine.status_of(1), PacketStatus::Sent);
        assert_eq!(feed.engine.log().len(), 1);
    }

    #[test]
    fn test_toggle_pause() {
        let mut engine = StateEngine::new();
        assert!(engine.toggle_pause());
        assert!(engine.is_paused());
        assert!(!engine.toggle_pause());
    }

    #[test]
    fn test_reset_restores_fresh_state() {
        let mut feed = Feed::new();
        feed.push(sent_in(0, 0, 9));
        feed.push(WireEvent::AckReceived { ack: 0 });
        feed.push(WireEvent::Timeout { seq: 1 });
        feed.push(progress(5, 10, Some("a.bin")));
        feed.engine.note_window_request(20);

        feed.engine.reset();

        let mut snapshot = feed.engine.snapshot();
        snapshot.animations.clear();
        let mut fresh = StateEngine::new().snapshot();
        fresh.animations.clear();
        assert_eq!(snapshot, fresh);
        assert_eq!(
            serde_json::to_string(&snapshot).unwrap(),
            fresh_snapshot()
        );
    }

    #[test]
    fn test_log_capped_at_capacity() {
        let mut feed = Feed::new();
        for seq in 0..=(LOG_CAPACITY as u64) {
            feed.push(sent(seq));
        }

        let log = feed.engine.log();
        assert_eq!(log.len(), LOG_CAPACITY);
        assert_eq!(log.oldest().unwrap().relay_seq, 2);
        assert_eq!(log.latest().unwrap().relay_seq, LOG_CAPACITY as u64 + 1);
    }

    #[test]
    fn test_throughput_samples_capped() {
        let mut feed = Feed::new();
        for ack in 0..30 {
            feed.push(WireEvent::AckReceived { ack });
        }

        let samples: Vec<_> = feed.engine.throughput().collect();
        assert_eq!(samples.len(), THROUGHPUT_CAPACITY);
        assert_eq!(samples.last().unwrap().ack, 29);
        assert_eq!(samples.first().unwrap().ack, 30 - THROUGHPUT_CAPACITY as u64);
    }

    #[test]
    fn test_acks_per_second() {
        let mut engine = StateEngine::new();
        assert_eq!(engine.acks_per_second(), 0.0);

        // three ACKs spread over 500ms
        for (i, at) in [1_000u64, 1_250, 1_500].iter().enumerate() {
            let event = ProtocolEvent::new(i as u64 + 1, *at, WireEvent::AckReceived { ack: i as u64 });
            engine.apply(&event);
        }
        assert_approx_eq!(engine.acks_per_second(), 4.0, 1e-9);
    }

    #[test]
    fn test_animation_markers_follow_events() {
        let mut engine = StateEngine::new();
        let now = Instant::now();

        engine.apply_at(&ProtocolEvent::new(1, 0, sent(4)), now);
        engine.apply_at(&ProtocolEvent::new(2, 0, WireEvent::Timeout { seq: 5 }), now);
        engine.apply_at(
            &ProtocolEvent::new(
                3,
                0,
                WireEvent::WindowMoved {
                    old_start: None,
                    new_start: 1,
                    new_end: 5,
                },
            ),
            now,
        );

        let snapshot = engine.snapshot_at(now);
        assert_eq!(snapshot.animations.len(), 2);
        assert_eq!(
            engine.animations().marker_for(4, now).unwrap().kind,
            AnimationKind::Fly
        );
        assert_eq!(
            engine.animations().marker_for(5, now).unwrap().kind,
            AnimationKind::Shake
        );

        let later = now + ANIMATION_TTL + Duration::from_millis(1);
        assert!(engine.snapshot_at(later).animations.is_empty());
        // expiry never touches protocol state
        assert_eq!(engine.status_of(4), PacketStatus::Sent);
    }

    fn arb_event() -> impl Strategy<Value = WireEvent> {
        let seq = 0u64..8;
        prop_oneof![
            (seq.clone(), proptest::option::of(0u64..4)).prop_map(|(seq, start)| {
                WireEvent::PacketSent {
                    seq,
                    window_start: start,
                    window_end: start.map(|s| s + 4),
                }
            }),
            seq.clone().prop_map(|ack| WireEvent::AckReceived { ack }),
            seq.clone().prop_map(|seq| WireEvent::Timeout { seq }),
            seq.clone().prop_map(|seq| WireEvent::Retransmit { seq }),
            seq.prop_map(|seq| WireEvent::PacketReceived { seq }),
            (0u64..8, 0u64..4).prop_map(|(start, extra)| WireEvent::WindowMoved {
                old_start: None,
                new_start: start,
                new_end: start + extra,
            }),
            (0u64..2048, 0u64..2048).prop_map(|(received, total)| WireEvent::ProgressUpdate {
                received,
                total,
                file_name: None,
                timestamp: None,
            }),
        ]
    }

    proptest! {
        #[test]
        fn prop_acked_is_terminal(events in proptest::collection::vec(arb_event(), 0..64), acked in 0u64..8) {
            let mut feed = Feed::new();
            feed.push(WireEvent::AckReceived { ack: acked });

            for event in events {
                feed.push(event);
                prop_assert_eq!(feed.engine.status_of(acked), PacketStatus::Acked);
            }
        }

        #[test]
        fn prop_metrics_never_decrease(events in proptest::collection::vec(arb_event(), 0..64)) {
            let mut feed = Feed::new();
            let mut previous = feed.engine.metrics();

            for event in events {
                feed.push(event);
                let current = feed.engine.metrics();
                prop_assert!(current.sent >= previous.sent);
                prop_assert!(current.acked >= previous.acked);
                prop_assert!(current.timeouts >= previous.timeouts);
                prop_assert!(current.retransmits >= previous.retransmits);
                previous = current;
            }
        }

        #[test]
        fn prop_log_never_exceeds_capacity(events in proptest::collection::vec(arb_event(), 0..200)) {
            let mut feed = Feed::new();
            for event in events {
                feed.push(event);
                prop_assert!(feed.engine.log().len() <= LOG_CAPACITY);
            }
        }

        #[test]
        fn prop_window_stays_ordered(events in proptest::collection::vec(arb_event(), 0..64)) {
            let mut feed = Feed::new();
            for event in events {
                feed.push(event);
                let window = feed.engine.window();
                prop_assert!(window.start <= window.end);
            }
        }
    }
}
