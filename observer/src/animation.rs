//! Short-lived visual markers keyed to packet identifiers
//!
//! Markers only say "something just happened to this sequence number". They
//! carry an explicit expiry instant that consumers check; nothing is removed
//! by timers, and engine state never depends on them.

use serde::Serialize;
use std::time::{Duration, Instant};

/// Visual intent of a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    /// Packet sent
    Fly,
    /// Packet acknowledged
    Blink,
    /// Packet timed out
    Shake,
    /// Packet retransmitted
    Bounce,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationMarker {
    pub id: u64,
    pub seq: u64,
    pub kind: AnimationKind,
    pub expires_at: Instant,
}

impl AnimationMarker {
    pub fn is_active(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct AnimationTracker {
    markers: Vec<AnimationMarker>,
    next_id: u64,
    ttl: Duration,
}

impl AnimationTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            markers: Vec::new(),
            next_id: 1,
            ttl,
        }
    }

    /// Adds a marker expiring `ttl` after `now` and returns its id.
    ///
    /// Expired markers are pruned on the way in so the collection stays
    /// bounded by the event rate over one ttl.
    pub fn mark(&mut self, seq: u64, kind: AnimationKind, now: Instant) -> u64 {
        self.prune(now);

        let id = self.next_id;
        self.next_id += 1;
        self.markers.push(AnimationMarker {
            id,
            seq,
            kind,
            expires_at: now + self.ttl,
        });
        id
    }

    pub fn active(&self, now: Instant) -> impl Iterator<Item = &AnimationMarker> {
        self.markers.iter().filter(move |m| m.is_active(now))
    }

    /// Most recent live marker for a sequence number
    pub fn marker_for(&self, seq: u64, now: Instant) -> Option<&AnimationMarker> {
        self.active(now).filter(|m| m.seq == seq).last()
    }

    pub fn prune(&mut self, now: Instant) {
        self.markers.retain(|m| m.is_active(now));
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ANIMATION_TTL;

    #[test]
    fn test_marker_expires_after_ttl() {
        let mut tracker = AnimationTracker::new(ANIMATION_TTL);
        let start = Instant::now();

        tracker.mark(3, AnimationKind::Fly, start);

        assert!(tracker.marker_for(3, start).is_some());
        assert!(tracker
            .marker_for(3, start + Duration::from_millis(699))
            .is_some());
        assert!(tracker.marker_for(3, start + ANIMATION_TTL).is_none());
    }

    #[test]
    fn test_markers_for_different_ids_coexist() {
        let mut tracker = AnimationTracker::new(ANIMATION_TTL);
        let now = Instant::now();

        tracker.mark(1, AnimationKind::Fly, now);
        tracker.mark(2, AnimationKind::Shake, now);

        assert_eq!(tracker.active(now).count(), 2);
        assert_eq!(tracker.marker_for(2, now).unwrap().kind, AnimationKind::Shake);
    }

    #[test]
    fn test_latest_marker_wins_for_same_seq() {
        let mut tracker = AnimationTracker::new(ANIMATION_TTL);
        let now = Instant::now();

        tracker.mark(5, AnimationKind::Fly, now);
        let later = now + Duration::from_millis(100);
        let id = tracker.mark(5, AnimationKind::Blink, later);

        let marker = tracker.marker_for(5, later).unwrap();
        assert_eq!(marker.id, id);
        assert_eq!(marker.kind, AnimationKind::Blink);
    }

    #[test]
    fn test_prune_is_idempotent() {
        let mut tracker = AnimationTracker::new(ANIMATION_TTL);
        let now = Instant::now();
        tracker.mark(1, AnimationKind::Bounce, now);

        let later = now + Duration::from_secs(1);
        tracker.prune(later);
        tracker.prune(later);

        assert!(tracker.is_empty());
    }

    #[test]
    fn test_mark_prunes_expired_markers() {
        let mut tracker = AnimationTracker::new(ANIMATION_TTL);
        let now = Instant::now();
        tracker.mark(1, AnimationKind::Fly, now);
        tracker.mark(2, AnimationKind::Fly, now);

        tracker.mark(3, AnimationKind::Fly, now + Duration::from_secs(2));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut tracker = AnimationTracker::new(ANIMATION_TTL);
        let now = Instant::now();
        let a = tracker.mark(1, AnimationKind::Fly, now);
        let b = tracker.mark(1, AnimationKind::Fly, now);
        assert_ne!(a, b);
    }
}
