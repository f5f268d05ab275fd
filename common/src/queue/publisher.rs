// Event publisher: bounded retry with backoff on top of a message sink

use crate::errors::QueueError;
use crate::queue::nats::NatsClient;
use crate::retry::{RetryStrategy, Sleeper, TokioSleeper};
use crate::telemetry;
use async_nats::jetstream::context::PublishAckFuture;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Header carrying the partition key of a message
pub const EVENT_ID_HEADER: &str = "Event-Id";

/// One message bound for the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    /// Partition key: the event identifier
    pub key: String,
    pub payload: Vec<u8>,
}

/// A single delivery attempt to the downstream stream
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), QueueError>;
}

/// NATS JetStream sink: the topic is the subject, the key travels as a header
pub struct NatsMessageSink {
    client: NatsClient,
    ack_timeout: Duration,
}

impl NatsMessageSink {
    pub fn new(client: NatsClient) -> Self {
        Self {
            client,
            ack_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }
}

#[async_trait]
impl MessageSink for NatsMessageSink {
    #[instrument(skip(self, message), fields(topic = %message.topic, event_id = %message.key))]
    async fn send(&self, message: OutboundMessage) -> Result<(), QueueError> {
        let mut headers = async_nats::HeaderMap::new();
        headers.insert(EVENT_ID_HEADER, message.key.as_str());

        let publish_future: PublishAckFuture = self
            .client
            .jetstream()
            .publish_with_headers(message.topic, headers, message.payload.into())
            .await
            .map_err(|e| QueueError::PublishFailed(format!("Failed to publish message: {}", e)))?;

        match tokio::time::timeout(self.ack_timeout, publish_future).await {
            Ok(Ok(_ack)) => Ok(()),
            Ok(Err(e)) => Err(QueueError::PublishFailed(format!(
                "Failed to get publish acknowledgment: {}",
                e
            ))),
            Err(_) => Err(QueueError::Timeout(format!(
                "Publish acknowledgment timeout after {:?}",
                self.ack_timeout
            ))),
        }
    }
}

/// Terminal result of one publish call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered { attempts: u32 },
    /// Every attempt failed
    Exhausted { attempts: u32, last_error: String },
    /// Cancelled while waiting to retry
    Aborted { attempts: u32 },
}

impl PublishOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            PublishOutcome::Delivered { attempts }
            | PublishOutcome::Exhausted { attempts, .. }
            | PublishOutcome::Aborted { attempts } => *attempts,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, PublishOutcome::Delivered { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            PublishOutcome::Delivered { .. } => "delivered",
            PublishOutcome::Exhausted { .. } => "exhausted",
            PublishOutcome::Aborted { .. } => "aborted",
        }
    }
}

/// States of the retry loop
#[derive(Debug)]
enum RetryState {
    Attempt(u32),
    Backoff { attempt: u32, delay: Duration },
    Finished(PublishOutcome),
}

/// Publishes payloads with bounded retry. Failures never escape: every call
/// ends in a [`PublishOutcome`] that has already been logged.
pub struct EventPublisher {
    sink: Arc<dyn MessageSink>,
    strategy: Arc<dyn RetryStrategy>,
    sleeper: Arc<dyn Sleeper>,
}

impl EventPublisher {
    pub fn new(sink: Arc<dyn MessageSink>, strategy: Arc<dyn RetryStrategy>) -> Self {
        Self {
            sink,
            strategy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Deliver `payload` to `topic` keyed by `key`.
    ///
    /// Cancelling `cancel` interrupts a pending backoff wait and ends the loop
    /// with [`PublishOutcome::Aborted`]; an attempt already in progress is
    /// allowed to finish.
    #[instrument(skip(self, payload, cancel), fields(topic = %topic, event_id = %key))]
    pub async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: Vec<u8>,
        cancel: &CancellationToken,
    ) -> PublishOutcome {
        let message = OutboundMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload,
        };
        let max_attempts = self.strategy.max_attempts();
        let mut state = RetryState::Attempt(1);

        let outcome = loop {
            state = match state {
                RetryState::Attempt(attempt) => {
                    telemetry::record_publish_attempt();
                    match self.sink.send(message.clone()).await {
                        Ok(()) => RetryState::Finished(PublishOutcome::Delivered { attempts: attempt }),
                        Err(e) => {
                            warn!(
                                attempt,
                                max_attempts,
                                error = %e,
                                "Publish attempt failed"
                            );
                            if self.strategy.should_retry(attempt) {
                                RetryState::Backoff {
                                    attempt,
                                    delay: self.strategy.delay_after(attempt),
                                }
                            } else {
                                RetryState::Finished(PublishOutcome::Exhausted {
                                    attempts: attempt,
                                    last_error: e.to_string(),
                                })
                            }
                        }
                    }
                }
                RetryState::Backoff { attempt, delay } => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            RetryState::Finished(PublishOutcome::Aborted { attempts: attempt })
                        }
                        _ = self.sleeper.sleep(delay) => RetryState::Attempt(attempt + 1),
                    }
                }
                RetryState::Finished(outcome) => break outcome,
            };
        };

        match &outcome {
            PublishOutcome::Delivered { attempts } => {
                info!(attempts, "Published event payload");
            }
            PublishOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                error!(
                    attempts,
                    error = %last_error,
                    "Failed to publish event payload, giving up"
                );
            }
            PublishOutcome::Aborted { attempts } => {
                error!(attempts, "Retry wait interrupted by cancellation, giving up");
            }
        }
        telemetry::record_publish_outcome(outcome.label());

        outcome
    }
}
