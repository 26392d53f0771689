//! Key input plumbing for pedal-feedback
//!
//! Shared by the `pedal-feedbackd` daemon and the `pedal-feedback` CLI:
//! device discovery and selection, evdev key events to raw key strings, and
//! the reader task that feeds a tracker.

pub mod device;
pub mod keymap;
pub mod source;
