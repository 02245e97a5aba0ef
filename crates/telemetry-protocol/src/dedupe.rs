//! Bounded event-id dedupe set.
//!
//! Spec §9 Open Questions leaves whether the scorer's baseline update
//! dedupes by `event_id` as a configuration knob rather than an assumption.
//! This is the shared primitive both the scorer and, optionally, the
//! Normalizer/Rules Engine use to implement that knob.

use std::collections::VecDeque;

use common::types::EventId;
use std::collections::HashSet;

/// A fixed-capacity, oldest-first-eviction set of seen event ids.
///
/// Not a perfect LRU (eviction is FIFO by insertion order, not by last
/// access) which is sufficient for a short dedupe window of recent
/// redeliveries rather than a long-lived cache.
pub struct SeenIds {
    capacity: usize,
    order: VecDeque<EventId>,
    set: HashSet<EventId>,
}

impl SeenIds {
    /// Create a dedupe set bounded to `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            set: HashSet::with_capacity(capacity),
        }
    }

    /// Record `id` as seen, evicting the oldest entry if at capacity.
    ///
    /// Returns `true` if `id` was already present (a duplicate).
    pub fn observe(&mut self, id: EventId) -> bool {
        if self.set.contains(&id) {
            return true;
        }

        if self.capacity == 0 {
            return false;
        }

        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }

        self.order.push_back(id);
        self.set.insert(id);
        false
    }

    /// Number of ids currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_not_a_duplicate() {
        let mut seen = SeenIds::new(10);
        let id = EventId::new();
        assert!(!seen.observe(id));
    }

    #[test]
    fn repeated_observation_is_a_duplicate() {
        let mut seen = SeenIds::new(10);
        let id = EventId::new();
        assert!(!seen.observe(id));
        assert!(seen.observe(id));
    }

    #[test]
    fn evicts_oldest_when_at_capacity() {
        let mut seen = SeenIds::new(2);
        let a = EventId::new();
        let b = EventId::new();
        let c = EventId::new();

        assert!(!seen.observe(a));
        assert!(!seen.observe(b));
        assert!(!seen.observe(c)); // evicts `a`
        assert_eq!(seen.len(), 2);

        // `a` was evicted, so it is no longer considered a duplicate.
        assert!(!seen.observe(a));
    }

    #[test]
    fn zero_capacity_never_dedupes() {
        let mut seen = SeenIds::new(0);
        let id = EventId::new();
        assert!(!seen.observe(id));
        assert!(!seen.observe(id));
        assert!(seen.is_empty());
    }
}
