//! Error types for the flush boundary.

use thiserror::Error;

/// Errors that can occur when flushing the event queue.
///
/// None of these reach the caller of [`crate::Tracker::track_event`]; the
/// tracker handles them internally by retaining the batch for the next tick.
#[derive(Debug, Error)]
pub enum FlushError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned {status}")]
    Status { status: reqwest::StatusCode },

    /// Endpoint answered 2xx but the body was not valid JSON
    #[error("invalid response body: {0}")]
    InvalidBody(#[source] reqwest::Error),
}
