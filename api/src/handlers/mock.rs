use axum::{extract::Path, Json};
use common::models::ExternalSnapshot;

/// Stand-in for the external data API: every event scores "0:0"
#[tracing::instrument]
pub async fn mock_snapshot(Path(event_id): Path<String>) -> Json<ExternalSnapshot> {
    Json(ExternalSnapshot {
        event_id,
        current_score: "0:0".to_string(),
    })
}
