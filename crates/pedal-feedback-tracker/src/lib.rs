//! Pedal input tracking
//!
//! Turns raw key-down events into pedal highlights and an input history:
//!
//! - [`normalizer`] classifies a raw key into a configured logical key and a
//!   [`ActiveHalf`] (top for a plain press, bottom for a shifted one)
//! - [`highlight`] keeps the per-key highlight state and its expiry deadlines
//! - [`history`] keeps a bounded, newest-first log of accepted events
//! - [`tracker`] ties the three together behind a single entry point
//! - [`service`] runs a tracker on its own tokio task, firing expiries and
//!   publishing snapshots to observers
//! - [`render`] turns snapshots into text or JSON for display

pub mod error;
pub mod highlight;
pub mod history;
pub mod normalizer;
pub mod render;
pub mod service;
pub mod tracker;

pub use error::TrackerError;
pub use highlight::HighlightTracker;
pub use history::{HistoryItem, HistoryLog};
pub use normalizer::{is_shifted, normalize, ActiveHalf, NormalizedKey};
pub use render::{render_json, render_text, OutputFormat};
pub use service::{KeySender, TrackerHandle, TrackerService};
pub use tracker::{PedalTracker, Snapshot, TrackerOptions};

pub use pedal_feedback_config::{KeyConfig, PedalKey};
