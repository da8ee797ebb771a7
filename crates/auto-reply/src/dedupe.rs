use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use chatrelay_config::DedupeConfig;

/// TTL cache of recently seen inbound message ids.
///
/// Expired entries are only dropped by [`sweep`](Self::sweep), which the
/// router calls on every inbound event. Under low traffic stale ids can
/// linger; they no longer block anything, they just take memory until the
/// next event arrives.
pub struct Deduplicator {
    entries: HashMap<String, Instant>,
    window: Duration,
    max_entries: usize,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::from_config(&DedupeConfig::default())
    }
}

impl Deduplicator {
    pub fn new(window: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            window,
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &DedupeConfig) -> Self {
        Self::new(config.window(), config.max_entries)
    }

    /// Returns true if `id` was already recorded within the window (no state
    /// change). Otherwise records `id` as seen now and returns false.
    pub fn seen_or_record(&mut self, id: &str) -> bool {
        self.seen_or_record_at(id, Instant::now())
    }

    pub fn seen_or_record_at(&mut self, id: &str, now: Instant) -> bool {
        if let Some(first_seen) = self.entries.get(id)
            && now.saturating_duration_since(*first_seen) <= self.window
        {
            return true;
        }

        if self.entries.len() >= self.max_entries
            && !self.entries.contains_key(id)
            && let Some(oldest_key) = self
                .entries
                .iter()
                .min_by_key(|(_, seen)| **seen)
                .map(|(k, _)| k.clone())
        {
            self.entries.remove(&oldest_key);
        }
        self.entries.insert(id.to_string(), now);
        false
    }

    /// Drop every entry older than the window.
    pub fn sweep(&mut self, now: Instant) {
        let window = self.window;
        self.entries
            .retain(|_, seen| now.saturating_duration_since(*seen) <= window);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn second_sighting_within_window_is_duplicate() {
        let mut dedupe = Deduplicator::new(WINDOW, 100);
        let t0 = Instant::now();

        assert!(!dedupe.seen_or_record_at("m1", t0));
        assert!(dedupe.seen_or_record_at("m1", t0 + Duration::from_secs(30)));
        assert!(dedupe.seen_or_record_at("m1", t0 + WINDOW));
        assert_eq!(dedupe.len(), 1);
    }

    #[test]
    fn duplicate_does_not_refresh_first_seen() {
        let mut dedupe = Deduplicator::new(WINDOW, 100);
        let t0 = Instant::now();

        dedupe.seen_or_record_at("m1", t0);
        dedupe.seen_or_record_at("m1", t0 + Duration::from_secs(50));
        assert!(!dedupe.seen_or_record_at("m1", t0 + Duration::from_secs(61)));
    }

    #[test]
    fn id_is_new_again_after_window_and_sweep() {
        let mut dedupe = Deduplicator::new(WINDOW, 100);
        let t0 = Instant::now();
        dedupe.seen_or_record_at("m1", t0);

        let later = t0 + Duration::from_secs(61);
        dedupe.sweep(later);
        assert!(dedupe.is_empty());
        assert!(!dedupe.seen_or_record_at("m1", later));
    }

    #[test]
    fn sweep_keeps_fresh_entries() {
        let mut dedupe = Deduplicator::new(WINDOW, 100);
        let t0 = Instant::now();
        dedupe.seen_or_record_at("old", t0);
        dedupe.seen_or_record_at("fresh", t0 + Duration::from_secs(40));

        dedupe.sweep(t0 + Duration::from_secs(70));

        assert_eq!(dedupe.len(), 1);
        assert!(dedupe.seen_or_record_at("fresh", t0 + Duration::from_secs(70)));
    }

    #[test]
    fn ids_compare_exactly() {
        let mut dedupe = Deduplicator::new(WINDOW, 100);
        let t0 = Instant::now();
        dedupe.seen_or_record_at("m1", t0);
        assert!(!dedupe.seen_or_record_at("M1", t0));
        assert!(!dedupe.seen_or_record_at("m1 ", t0));
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut dedupe = Deduplicator::new(WINDOW, 2);
        let t0 = Instant::now();
        dedupe.seen_or_record_at("a", t0);
        dedupe.seen_or_record_at("b", t0 + Duration::from_secs(1));
        dedupe.seen_or_record_at("c", t0 + Duration::from_secs(2));

        assert_eq!(dedupe.len(), 2);
        assert!(!dedupe.seen_or_record_at("a", t0 + Duration::from_secs(3)));
    }
}
