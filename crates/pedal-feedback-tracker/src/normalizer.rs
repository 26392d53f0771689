//! Raw key classification
//!
//! A raw key is the case-preserved string a key-down produced (`"a"`, `"A"`,
//! `"!"`, `"Enter"`, ...). Classification maps it to the lower-case logical
//! key used to look up the pedal, plus the half of the pedal it lights up.

use std::fmt;

use pedal_feedback_config::KeyConfig;
use serde::{Deserialize, Serialize};

/// Which half of a pedal an event lights up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveHalf {
    /// Plain press
    Top,
    /// Shifted (upper-case) press
    Bottom,
}

impl fmt::Display for ActiveHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveHalf::Top => write!(f, "top"),
            ActiveHalf::Bottom => write!(f, "bottom"),
        }
    }
}

/// A raw key that matched a configured pedal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedKey {
    /// Lower-case logical key
    pub key: String,
    pub half: ActiveHalf,
}

/// Returns true when `raw` is a single cased character in its upper-case form.
///
/// Digits and symbols have no case: their upper and lower forms are equal,
/// so they are never considered shifted.
pub fn is_shifted(raw: &str) -> bool {
    let mut chars = raw.chars();
    let single = chars.next().is_some() && chars.next().is_none();

    single && raw.to_uppercase() == raw && raw.to_lowercase() != raw
}

/// Classify a raw key against the configured pedals.
///
/// Returns `None` when the lower-cased key is not configured; such events
/// are ignored entirely.
pub fn normalize(raw: &str, keys: &KeyConfig) -> Option<NormalizedKey> {
    let key = raw.to_lowercase();
    if !keys.contains(&key) {
        return None;
    }

    let half = if is_shifted(raw) {
        ActiveHalf::Bottom
    } else {
        ActiveHalf::Top
    };

    Some(NormalizedKey { key, half })
}
