// One poll-and-publish tick for a single event

use crate::models::EventPayload;
use crate::queue::{EventPublisher, PublishOutcome};
use crate::source::SnapshotSource;
use crate::telemetry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

/// What a tick ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Published(PublishOutcome),
    FetchFailed,
    PayloadFailed,
    /// The job was cancelled while the fetch was in flight
    Cancelled,
}

/// Fetches a snapshot for an event and hands the payload to the publisher.
///
/// Failures end the tick only; nothing is retried within a tick.
pub struct PollTask {
    source: Arc<dyn SnapshotSource>,
    publisher: Arc<EventPublisher>,
    topic: String,
}

impl PollTask {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        publisher: Arc<EventPublisher>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            source,
            publisher,
            topic: topic.into(),
        }
    }

    #[instrument(skip(self, cancel))]
    pub async fn run(&self, event_id: &str, cancel: &CancellationToken) -> TickOutcome {
        telemetry::record_tick();

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Tick cancelled during fetch");
                return TickOutcome::Cancelled;
            }
            fetched = self.source.fetch(event_id) => fetched,
        };

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                telemetry::record_fetch_failure();
                error!(error = %e, "Error calling external API");
                return TickOutcome::FetchFailed;
            }
        };

        let payload = EventPayload::from_snapshot(event_id, snapshot);
        let bytes = match payload.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "Failed to build payload");
                return TickOutcome::PayloadFailed;
            }
        };
        debug!(current_score = %payload.current_score, "Built payload");

        let outcome = self
            .publisher
            .publish(&self.topic, event_id, bytes, cancel)
            .await;
        TickOutcome::Published(outcome)
    }
}
