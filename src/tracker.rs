//! The tracker: event queue, flush timer, and HTTP delivery.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::error::FlushError;
use crate::event::TrackedEvent;

/// Flush interval used by [`Tracker::new`].
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// State shared between the tracker handle and its flush timer task.
struct TrackerInner {
    endpoint: String,
    client: reqwest::Client,
    queue: Mutex<Vec<TrackedEvent>>,
}

/// Accumulates events in memory and periodically flushes them to a remote
/// HTTP endpoint as one JSON array.
///
/// The flush timer starts as soon as the tracker is constructed and keeps
/// running until [`stop_flush_interval`](Tracker::stop_flush_interval) is
/// called or the tracker is dropped. The endpoint is taken as-is; no format
/// validation is performed.
pub struct Tracker {
    inner: Arc<TrackerInner>,
    flush_interval: Duration,
    flush_handle: Option<JoinHandle<()>>,
}

impl Tracker {
    /// Create a tracker flushing every [`DEFAULT_FLUSH_INTERVAL`].
    ///
    /// Must be called within a tokio runtime; the flush timer is spawned
    /// immediately.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_interval(endpoint, DEFAULT_FLUSH_INTERVAL)
    }

    /// Create a tracker with an explicit flush interval.
    ///
    /// Must be called within a tokio runtime; the flush timer is spawned
    /// immediately.
    #[must_use]
    pub fn with_interval(endpoint: impl Into<String>, flush_interval: Duration) -> Self {
        let inner = Arc::new(TrackerInner {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
            queue: Mutex::new(Vec::new()),
        });

        let mut tracker = Self {
            inner,
            flush_interval,
            flush_handle: None,
        };
        tracker.start_flush_interval();
        tracker
    }

    /// Record an event with empty label, value, and metadata.
    ///
    /// Always succeeds; the only side effect is queue growth.
    pub fn track_event(&self, category: impl Into<String>, action: impl Into<String>) {
        self.track(TrackedEvent::new(category, action));
    }

    /// Record a fully populated event.
    pub fn track(&self, event: TrackedEvent) {
        self.inner.queue.lock().unwrap().push(event);
    }

    /// Start the repeating flush timer, replacing any timer already running.
    ///
    /// The previous timer is aborted first, so repeated calls never leave two
    /// timers ticking. The first flush fires one full interval after start.
    pub fn start_flush_interval(&mut self) {
        self.stop_flush_interval();

        let inner = Arc::clone(&self.inner);
        let flush_interval = self.flush_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(flush_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so flushes
            // start one interval from now.
            interval.tick().await;

            loop {
                interval.tick().await;
                inner.flush_events().await;
            }
        });

        self.flush_handle = Some(handle);
    }

    /// Stop the flush timer. Safe to call when already stopped.
    ///
    /// If a flush is in flight, its request is cancelled and the batch goes
    /// back on the queue, exactly as if the send had failed.
    pub fn stop_flush_interval(&mut self) {
        if let Some(handle) = self.flush_handle.take() {
            handle.abort();
        }
    }

    /// Whether the flush timer is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.flush_handle.is_some()
    }

    /// Discard all queued events without sending them. The timer is left
    /// untouched.
    pub fn clean_event_queue(&self) {
        self.inner.queue.lock().unwrap().clear();
    }

    /// Number of events waiting for the next flush.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.inner.queue.lock().unwrap().len()
    }

    /// The endpoint events are flushed to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Flush the queue now, independent of the timer.
    ///
    /// Same semantics as a timer tick: an empty queue issues no request, and
    /// a failed send puts the batch back for the next attempt. Errors are
    /// handled internally and never returned.
    pub async fn flush(&self) {
        self.inner.flush_events().await;
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.stop_flush_interval();
    }
}

impl TrackerInner {
    /// Drain the queue and send the batch, restoring it on failure.
    ///
    /// The queue is swapped for an empty one before any await, so events
    /// recorded while the request is in flight are never part of this
    /// flight's payload. On failure the batch goes back in front of them.
    /// The batch is held in a [`PendingBatch`] guard across the await, so
    /// aborting the timer task mid-request also restores it.
    async fn flush_events(&self) {
        let batch = {
            let mut queue = self.queue.lock().unwrap();
            if queue.is_empty() {
                return;
            }
            std::mem::take(&mut *queue)
        };

        let mut pending = PendingBatch {
            inner: self,
            events: batch,
        };

        match self.send_batch(&pending.events).await {
            Ok(()) => {
                let sent = pending.events.len();
                // Delivered; nothing for the guard to restore.
                pending.events.clear();
                debug!(
                    endpoint = %self.endpoint,
                    events = sent,
                    "Flushed event batch"
                );
            }
            Err(err) => {
                let retained = pending.events.len();
                drop(pending);

                match err {
                    // Non-2xx batches are retained silently; the next tick
                    // retries them.
                    FlushError::Status { .. } => {}
                    err => {
                        error!(
                            endpoint = %self.endpoint,
                            events = retained,
                            error = %err,
                            "Error sending events, batch retained"
                        );
                    }
                }
            }
        }
    }

    /// POST the batch as a JSON array and check the response.
    ///
    /// A 2xx response must carry a JSON body; the parsed value is unused.
    async fn send_batch(&self, batch: &[TrackedEvent]) -> Result<(), FlushError> {
        let response = self.client.post(&self.endpoint).json(batch).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FlushError::Status { status });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(FlushError::InvalidBody)?;

        Ok(())
    }

    /// Put a failed batch back in front of any events recorded since it was
    /// drained.
    fn requeue(&self, mut batch: Vec<TrackedEvent>) {
        let mut queue = self.queue.lock().unwrap();
        batch.append(&mut queue);
        *queue = batch;
    }
}

/// A drained batch that has not been delivered yet.
///
/// Restores its events to the front of the queue when dropped, which covers
/// both the failure branch of [`TrackerInner::flush_events`] and cancellation
/// of the timer task while the request is awaited (`JoinHandle::abort` drops
/// the flush future at that await).
struct PendingBatch<'a> {
    inner: &'a TrackerInner,
    events: Vec<TrackedEvent>,
}

impl Drop for PendingBatch<'_> {
    fn drop(&mut self) {
        if !self.events.is_empty() {
            self.inner.requeue(std::mem::take(&mut self.events));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Port 9 is the discard service; nothing flushes during these tests
    // because the default interval never elapses.
    const ENDPOINT: &str = "http://127.0.0.1:9/events";

    #[tokio::test]
    async fn constructor_starts_the_timer() {
        let tracker = Tracker::new(ENDPOINT);
        assert!(tracker.is_running());
        assert_eq!(tracker.endpoint(), ENDPOINT);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut tracker = Tracker::new(ENDPOINT);
        tracker.stop_flush_interval();
        assert!(!tracker.is_running());
        tracker.stop_flush_interval();
        assert!(!tracker.is_running());
    }

    #[tokio::test]
    async fn timer_can_be_restarted_after_stop() {
        let mut tracker = Tracker::new(ENDPOINT);
        tracker.stop_flush_interval();
        tracker.start_flush_interval();
        assert!(tracker.is_running());
    }

    #[tokio::test]
    async fn one_stop_kills_a_restarted_timer() {
        let mut tracker = Tracker::new(ENDPOINT);
        tracker.start_flush_interval();
        tracker.start_flush_interval();
        tracker.stop_flush_interval();
        assert!(!tracker.is_running());
    }

    #[tokio::test]
    async fn tracking_grows_the_queue_in_order() {
        let tracker = Tracker::new(ENDPOINT);
        tracker.track_event("ui", "click");
        tracker.track_event("ui", "scroll");
        assert_eq!(tracker.pending_events(), 2);
    }

    #[tokio::test]
    async fn clean_empties_the_queue_but_not_the_timer() {
        let tracker = Tracker::new(ENDPOINT);
        tracker.track_event("ui", "click");
        tracker.clean_event_queue();
        assert_eq!(tracker.pending_events(), 0);
        assert!(tracker.is_running());
    }
}
