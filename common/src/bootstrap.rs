// Bootstrap utilities: build the runtime components from settings

use crate::config::{PublisherConfig, Settings};
use crate::queue::{EventPublisher, MessageSink, NatsClient, NatsMessageSink};
use crate::repository::EventStatusRepository;
use crate::retry::{BackoffKind, ExponentialBackoff, LinearBackoff, RetryStrategy};
use crate::scheduler::{JobScheduler, PollTask, SchedulerConfig};
use crate::service::EventStatusService;
use crate::source::{HttpSnapshotSource, SnapshotSource};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Connect to NATS and make sure the stream for the publish topic exists
#[tracing::instrument(skip(settings))]
pub async fn init_nats_sink(settings: &Settings) -> Result<Arc<dyn MessageSink>> {
    info!("Initializing NATS client");

    let client = NatsClient::connect(settings.nats.clone())
        .await
        .context("Failed to connect to NATS")?;
    client
        .initialize_stream(&settings.publisher.topic)
        .await
        .context("Failed to initialize NATS stream")?;

    let sink = NatsMessageSink::new(client)
        .with_timeout(Duration::from_secs(settings.publisher.ack_timeout_seconds));

    info!("NATS sink initialized");
    Ok(Arc::new(sink))
}

/// HTTP snapshot source for the configured external API
pub fn init_snapshot_source(settings: &Settings) -> Result<Arc<dyn SnapshotSource>> {
    let source = HttpSnapshotSource::new(
        &settings.external_api.base_url,
        settings.external_api.timeout_seconds,
    )
    .context("Failed to create external API client")?;
    Ok(Arc::new(source))
}

/// Retry strategy selected by `publisher.backoff`
pub fn build_retry_strategy(config: &PublisherConfig) -> Arc<dyn RetryStrategy> {
    match config.backoff {
        BackoffKind::Linear => Arc::new(LinearBackoff::new(
            Duration::from_millis(config.base_delay_ms),
            config.max_attempts,
        )),
        BackoffKind::Exponential => Arc::new(ExponentialBackoff::with_config(
            config.base_delay_ms,
            config.max_delay_ms,
            config.jitter_factor,
            config.max_attempts,
        )),
    }
}

/// Wire publisher, poll task, scheduler and service together
pub fn build_service(
    settings: &Settings,
    source: Arc<dyn SnapshotSource>,
    sink: Arc<dyn MessageSink>,
) -> EventStatusService {
    let publisher = Arc::new(EventPublisher::new(
        sink,
        build_retry_strategy(&settings.publisher),
    ));
    let poll_task = Arc::new(PollTask::new(
        source,
        publisher,
        settings.publisher.topic.clone(),
    ));
    let scheduler = Arc::new(JobScheduler::new(
        SchedulerConfig {
            poll_interval: settings.scheduler.poll_interval(),
            worker_pool_size: settings.scheduler.worker_pool_size,
            shutdown_grace: settings.scheduler.shutdown_grace(),
        },
        poll_task,
    ));

    info!(
        poll_interval_seconds = settings.scheduler.poll_interval_seconds,
        worker_pool_size = settings.scheduler.worker_pool_size,
        topic = %settings.publisher.topic,
        "Job scheduler created"
    );

    EventStatusService::new(EventStatusRepository::new(), scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_retry_strategy_linear() {
        let config = Settings::default().publisher;
        let strategy = build_retry_strategy(&config);
        assert_eq!(strategy.max_attempts(), 3);
        assert_eq!(strategy.delay_after(2), Duration::from_secs(2));
    }

    #[test]
    fn test_build_retry_strategy_exponential() {
        let mut config = Settings::default().publisher;
        config.backoff = BackoffKind::Exponential;
        config.jitter_factor = 0.0;
        config.max_attempts = 5;
        let strategy = build_retry_strategy(&config);
        assert_eq!(strategy.max_attempts(), 5);
        assert_eq!(strategy.delay_after(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_init_snapshot_source_rejects_bad_url() {
        let mut settings = Settings::default();
        settings.external_api.base_url = "::not-a-url".to_string();
        assert!(init_snapshot_source(&settings).is_err());
    }
}
