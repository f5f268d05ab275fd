use std::sync::Arc;

use common::service::EventStatusService;
use metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EventStatusService>,
    /// Absent when no recorder was installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(service: Arc<EventStatusService>, metrics: Option<PrometheusHandle>) -> Self {
        Self { service, metrics }
    }
}
