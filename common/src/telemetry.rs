// Telemetry module for structured logging and metrics

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging with JSON formatting
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(
        log_level = log_level,
        "Structured logging initialized with JSON formatting"
    );

    Ok(())
}

/// Install the Prometheus recorder and describe every metric.
///
/// The returned handle renders the exposition text for `/metrics`.
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    describe_counter!(
        "event_status_updates_total",
        "Accepted status-change requests, by status"
    );
    describe_counter!("poll_ticks_total", "Poll ticks started");
    describe_counter!("fetch_failures_total", "Ticks that failed to fetch a snapshot");
    describe_counter!("publish_attempts_total", "Individual publish attempts");
    describe_counter!(
        "publish_outcomes_total",
        "Terminal publish outcomes, by outcome"
    );
    describe_gauge!("scheduled_jobs", "Events that currently have a polling job");

    tracing::info!("Prometheus metrics recorder installed");

    Ok(handle)
}

#[inline]
pub fn record_status_update(status: &str) {
    counter!("event_status_updates_total", "status" => status.to_string()).increment(1);
}

#[inline]
pub fn record_tick() {
    counter!("poll_ticks_total").increment(1);
}

#[inline]
pub fn record_fetch_failure() {
    counter!("fetch_failures_total").increment(1);
}

#[inline]
pub fn record_publish_attempt() {
    counter!("publish_attempts_total").increment(1);
}

#[inline]
pub fn record_publish_outcome(outcome: &'static str) {
    counter!("publish_outcomes_total", "outcome" => outcome).increment(1);
}

#[inline]
pub fn update_scheduled_jobs(count: usize) {
    gauge!("scheduled_jobs").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording_without_recorder() {
        record_status_update("live");
        record_tick();
        record_fetch_failure();
        record_publish_attempt();
        record_publish_outcome("delivered");
        update_scheduled_jobs(2);
    }

    #[test]
    fn test_recorded_metrics_reach_the_prometheus_handle() {
        // Only test in this binary that installs the global recorder
        let handle = init_metrics().unwrap();

        record_tick();
        record_publish_outcome("delivered");
        update_scheduled_jobs(3);

        let rendered = handle.render();
        assert!(rendered.contains("poll_ticks_total"), "rendered: {}", rendered);
        assert!(rendered.contains("publish_outcomes_total"));
        assert!(rendered.contains("scheduled_jobs"));
    }
}
