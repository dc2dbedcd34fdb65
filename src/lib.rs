//! Client-side analytics event batching.
//!
//! Events are recorded in memory and periodically flushed to a remote HTTP
//! endpoint as a single JSON payload. A flush that fails keeps its batch
//! queued, so the next timer tick retries it; nothing is persisted across
//! process restarts.
//!
//! # Usage
//!
//! ```no_run
//! use batchtrack::{TrackedEvent, Tracker};
//! use std::time::Duration;
//!
//! # async fn run() {
//! // Starts the flush timer immediately (requires a tokio runtime).
//! let mut tracker =
//!     Tracker::with_interval("https://example.com/events", Duration::from_secs(5));
//!
//! tracker.track_event("ui", "click");
//! tracker.track(
//!     TrackedEvent::new("checkout", "purchase")
//!         .with_label("sku-123")
//!         .with_value("19.99"),
//! );
//!
//! // Deliver anything still queued before shutdown.
//! tracker.flush().await;
//! tracker.stop_flush_interval();
//! # }
//! ```
//!
//! # Delivery semantics
//!
//! Each flush swaps the queue for an empty one, POSTs the swapped batch as a
//! JSON array with `Content-Type: application/json`, and drops the batch once
//! the endpoint answers 2xx with a JSON body. On any failure the batch is put
//! back in front of events recorded while the request was in flight. Failures
//! never reach the caller of [`Tracker::track_event`]; transport errors are
//! logged through [`tracing`].

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod event;
pub mod tracker;

pub use error::FlushError;
pub use event::{EventMetadata, TrackedEvent};
pub use tracker::{Tracker, DEFAULT_FLUSH_INTERVAL};
