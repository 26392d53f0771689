//! Tracker façade: one entry point for key-downs, one read-only snapshot

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Local;
use pedal_feedback_config::{Config, KeyConfig, DEFAULT_HIGHLIGHT_DURATION_MS, DEFAULT_HISTORY_LIMIT};
use serde::Serialize;
use tokio::time::Instant;

use crate::highlight::HighlightTracker;
use crate::history::{HistoryItem, HistoryLog};
use crate::normalizer::{normalize, ActiveHalf};

/// Construction parameters for a tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerOptions {
    /// Configured pedals; every other key is ignored
    pub key_config: KeyConfig,
    /// How long a half stays highlighted after its latest key-down
    pub highlight_duration: Duration,
    /// Maximum number of history entries
    pub history_limit: usize,
}

impl TrackerOptions {
    pub fn new(key_config: KeyConfig) -> Self {
        Self {
            key_config,
            highlight_duration: Duration::from_millis(DEFAULT_HIGHLIGHT_DURATION_MS),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_highlight_duration(mut self, duration: Duration) -> Self {
        self.highlight_duration = duration;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self::new(KeyConfig::default_pedals())
    }
}

impl From<&Config> for TrackerOptions {
    fn from(config: &Config) -> Self {
        Self {
            key_config: config.keys.clone(),
            highlight_duration: Duration::from_millis(config.global.highlight_duration_ms),
            history_limit: config.global.history_limit,
        }
    }
}

/// Read-only view of a tracker's state, as handed to renderers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Currently highlighted keys and the half lit up on each
    pub active_halves: BTreeMap<String, ActiveHalf>,
    /// Accepted events, newest first
    pub history: Vec<HistoryItem>,
}

/// Highlight and history state driven by raw key-downs.
///
/// `PedalTracker` does no scheduling of its own: the owner feeds it the
/// current time and calls [`PedalTracker::expire_due`] once
/// [`PedalTracker::next_deadline`] has passed. [`TrackerService`] does this
/// on a tokio task.
///
/// [`TrackerService`]: crate::TrackerService
#[derive(Debug, Clone)]
pub struct PedalTracker {
    options: TrackerOptions,
    highlights: HighlightTracker,
    history: HistoryLog,
}

impl PedalTracker {
    pub fn new(options: TrackerOptions) -> Self {
        let highlights = HighlightTracker::new(options.highlight_duration);
        let history = HistoryLog::new(options.history_limit);
        Self {
            options,
            highlights,
            history,
        }
    }

    pub fn options(&self) -> &TrackerOptions {
        &self.options
    }

    pub fn key_config(&self) -> &KeyConfig {
        &self.options.key_config
    }

    /// Handle one raw key-down.
    ///
    /// Unconfigured keys are ignored and return `None`. Otherwise the key is
    /// highlighted on its half, its expiry is (re)scheduled from `now`, and
    /// a history item stamped with the current wall-clock time is recorded
    /// and returned.
    pub fn handle_key_down(&mut self, raw_key: &str, now: Instant) -> Option<HistoryItem> {
        let normalized = normalize(raw_key, &self.options.key_config)?;

        let item = HistoryItem::new(normalized.key, normalized.half, Local::now());

        self.highlights.record_activation(&item.key, item.half, now);
        self.history.append(item.clone());

        tracing::debug!("Key '{}' -> {} ({})", raw_key, item.key, item.half);

        Some(item)
    }

    /// Highlight a configured key directly, bypassing history.
    ///
    /// Returns false (and changes nothing) for keys that are not configured.
    pub fn record_activation(&mut self, key: &str, half: ActiveHalf, now: Instant) -> bool {
        if !self.options.key_config.contains(key) {
            return false;
        }
        self.highlights.record_activation(key, half, now);
        true
    }

    /// Clear highlights whose expiry is due. Returns true if any were cleared.
    pub fn expire_due(&mut self, now: Instant) -> bool {
        let expired = self.highlights.expire_due(now);
        for key in &expired {
            tracing::trace!("Highlight for '{}' expired", key);
        }
        !expired.is_empty()
    }

    /// When the next highlight expires, if any are active.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.highlights.next_deadline()
    }

    /// Drop all highlights and their pending expiries.
    pub fn clear_highlights(&mut self) {
        self.highlights.clear();
    }

    pub fn active_half(&self, key: &str) -> Option<ActiveHalf> {
        self.highlights.get(key)
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            active_halves: self.highlights.snapshot(),
            history: self.history.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn history_keys(tracker: &PedalTracker) -> Vec<(String, ActiveHalf)> {
        tracker
            .snapshot()
            .history
            .into_iter()
            .map(|i| (i.key, i.half))
            .collect()
    }

    #[test]
    fn test_unconfigured_keys_change_nothing() {
        let mut tracker = PedalTracker::new(TrackerOptions::default());
        let now = Instant::now();

        for raw in ["b", "Z", "1", "Enter", " ", ""] {
            assert!(tracker.handle_key_down(raw, now).is_none());
        }

        assert_eq!(tracker.snapshot(), Snapshot::default());
        assert_eq!(tracker.next_deadline(), None);
    }

    #[test]
    fn test_case_selects_half() {
        let mut tracker = PedalTracker::new(TrackerOptions::default());
        let now = Instant::now();

        let top = tracker.handle_key_down("a", now).unwrap();
        assert_eq!((top.key.as_str(), top.half), ("a", ActiveHalf::Top));

        let bottom = tracker.handle_key_down("L", now).unwrap();
        assert_eq!((bottom.key.as_str(), bottom.half), ("l", ActiveHalf::Bottom));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.active_halves.get("a"), Some(&ActiveHalf::Top));
        assert_eq!(snapshot.active_halves.get("l"), Some(&ActiveHalf::Bottom));
    }

    #[test]
    fn test_history_order_a_l_a() {
        let mut tracker = PedalTracker::new(TrackerOptions::default());
        let now = Instant::now();

        tracker.handle_key_down("a", now);
        tracker.handle_key_down("l", now);
        tracker.handle_key_down("A", now);

        assert_eq!(
            history_keys(&tracker),
            vec![
                ("a".to_string(), ActiveHalf::Bottom),
                ("l".to_string(), ActiveHalf::Top),
                ("a".to_string(), ActiveHalf::Top),
            ]
        );
    }

    #[test]
    fn test_highlight_expires_but_history_remains() {
        let options = TrackerOptions::default().with_highlight_duration(ms(200));
        let mut tracker = PedalTracker::new(options);
        let t0 = Instant::now();

        tracker.handle_key_down("a", t0);
        assert!(!tracker.expire_due(t0 + ms(100)));
        assert_eq!(tracker.active_half("a"), Some(ActiveHalf::Top));

        assert!(tracker.expire_due(t0 + ms(200)));
        assert_eq!(tracker.active_half("a"), None);
        assert_eq!(tracker.history().len(), 1);
    }

    #[test]
    fn test_second_activation_owns_the_expiry() {
        let mut tracker = PedalTracker::new(TrackerOptions::default());
        let t0 = Instant::now();

        assert!(tracker.record_activation("a", ActiveHalf::Top, t0));
        assert!(tracker.record_activation("a", ActiveHalf::Bottom, t0 + ms(120)));

        assert!(!tracker.expire_due(t0 + ms(200)));
        assert_eq!(tracker.active_half("a"), Some(ActiveHalf::Bottom));
        assert_eq!(tracker.next_deadline(), Some(t0 + ms(320)));

        assert!(tracker.expire_due(t0 + ms(320)));
        assert_eq!(tracker.active_half("a"), None);
    }

    #[test]
    fn test_record_activation_rejects_unconfigured_key() {
        let mut tracker = PedalTracker::new(TrackerOptions::default());
        assert!(!tracker.record_activation("q", ActiveHalf::Top, Instant::now()));
        assert!(tracker.snapshot().active_halves.is_empty());
    }

    #[test]
    fn test_history_limit_applies() {
        let options = TrackerOptions::default().with_history_limit(2);
        let mut tracker = PedalTracker::new(options);
        let now = Instant::now();

        for raw in ["a", "l", "a", "L"] {
            tracker.handle_key_down(raw, now);
        }

        assert_eq!(
            history_keys(&tracker),
            vec![
                ("l".to_string(), ActiveHalf::Bottom),
                ("a".to_string(), ActiveHalf::Top),
            ]
        );
    }

    #[test]
    fn test_zero_history_limit_still_highlights() {
        let options = TrackerOptions::default().with_history_limit(0);
        let mut tracker = PedalTracker::new(options);

        let item = tracker.handle_key_down("a", Instant::now());

        assert!(item.is_some());
        assert!(tracker.snapshot().history.is_empty());
        assert_eq!(tracker.active_half("a"), Some(ActiveHalf::Top));
    }

    #[test]
    fn test_huge_history_limit_from_config() {
        let config = pedal_feedback_config::parse_config_str(
            "global { history-limit 9223372036854775807; }",
        )
        .unwrap();
        let mut tracker = PedalTracker::new(TrackerOptions::from(&config));

        let now = Instant::now();
        for key in ["a", "L", "a"] {
            tracker.handle_key_down(key, now);
        }
        assert_eq!(tracker.history().len(), 3);
    }

    #[test]
    fn test_empty_key_config_ignores_everything() {
        let mut tracker = PedalTracker::new(TrackerOptions::new(KeyConfig::empty()));
        assert!(tracker.handle_key_down("a", Instant::now()).is_none());
        assert_eq!(tracker.snapshot(), Snapshot::default());
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.global.highlight_duration_ms = 500;
        config.global.history_limit = 3;

        let options = TrackerOptions::from(&config);
        assert_eq!(options.highlight_duration, ms(500));
        assert_eq!(options.history_limit, 3);
        assert_eq!(options.key_config, KeyConfig::default_pedals());
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut tracker = PedalTracker::new(TrackerOptions::default());
        tracker.handle_key_down("A", Instant::now());

        let json = serde_json::to_value(tracker.snapshot()).unwrap();
        assert_eq!(json["active_halves"]["a"], "bottom");
        assert_eq!(json["history"][0]["key"], "a");
        assert_eq!(json["history"][0]["half"], "bottom");
        assert!(json["history"][0]["timestamp"].is_string());
    }
}
