//! Error types for the tracker service

use thiserror::Error;

/// Errors returned by a [`TrackerHandle`](crate::TrackerHandle) or its key senders
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// The tracker was disposed (or its task ended) and accepts no more keys
    #[error("Tracker has been disposed")]
    Disposed,
}
