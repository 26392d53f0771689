//! Per-key highlight state with expiry
//!
//! Every activation owns exactly one expiry deadline. Re-activating a key
//! replaces its deadline (and bumps its generation), so an expiry scheduled
//! for an older activation can never clear a newer highlight.
//!
//! ```text
//!   record(a, Top) @0        record(a, Bottom) @150        expire_due @350
//!   ──────●──────────────────────●────────────────────────────────●──────▶ t
//!         a=Top, due 200         a=Bottom, due 350 (200 dropped)  a cleared
//! ```
//!
//! The tracker never sleeps itself; callers pass the current time in and
//! ask for [`HighlightTracker::next_deadline`] to know when to come back.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tokio::time::Instant;

use crate::normalizer::ActiveHalf;

#[derive(Debug, Clone, Copy)]
struct Activation {
    half: ActiveHalf,
    deadline: Instant,
    generation: u64,
}

/// Highlight state for all pedals of one tracker.
#[derive(Debug, Clone)]
pub struct HighlightTracker {
    duration: Duration,
    active: HashMap<String, Activation>,
    next_generation: u64,
}

impl HighlightTracker {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            active: HashMap::new(),
            next_generation: 0,
        }
    }

    /// How long a highlight lasts after its latest activation.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Highlight `key` on `half`, replacing any previous highlight and its
    /// pending expiry.
    ///
    /// Returns the generation of this activation, which identifies the one
    /// expiry that is allowed to clear it (see [`HighlightTracker::expire`]).
    pub fn record_activation(&mut self, key: &str, half: ActiveHalf, now: Instant) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;

        let activation = Activation {
            half,
            deadline: now + self.duration,
            generation,
        };

        if let Some(previous) = self.active.insert(key.to_string(), activation) {
            tracing::trace!(
                "Key '{}' re-activated, dropping expiry of generation {}",
                key,
                previous.generation
            );
        }

        generation
    }

    /// Clear `key` if `generation` is still its latest activation.
    ///
    /// Returns true if the highlight was removed.
    pub fn expire(&mut self, key: &str, generation: u64) -> bool {
        match self.active.get(key) {
            Some(activation) if activation.generation == generation => {
                self.active.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Clear every highlight whose deadline is at or before `now`.
    ///
    /// Returns the cleared keys, sorted.
    pub fn expire_due(&mut self, now: Instant) -> Vec<String> {
        let mut expired: Vec<String> = self
            .active
            .iter()
            .filter(|(_, activation)| activation.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        expired.sort();

        for key in &expired {
            self.active.remove(key);
        }

        expired
    }

    /// The earliest pending expiry, if any key is highlighted.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.values().map(|a| a.deadline).min()
    }

    /// The half currently highlighted for `key`.
    pub fn get(&self, key: &str) -> Option<ActiveHalf> {
        self.active.get(key).map(|a| a.half)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Drop every highlight together with its pending expiry.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Copy of the currently highlighted keys and their halves.
    pub fn snapshot(&self) -> BTreeMap<String, ActiveHalf> {
        self.active
            .iter()
            .map(|(key, activation)| (key.clone(), activation.half))
            .collect()
    }
}
