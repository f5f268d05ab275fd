use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use common::errors::ValidationError;
use common::models::{EventStatus, EventStatusRequest, StatusRecord};
use std::collections::HashMap;

use crate::handlers::{ErrorResponse, SuccessResponse};
use crate::state::AppState;

/// Record a status change and start or stop polling for the event.
///
/// Returns as soon as the store write and scheduler transition are done;
/// it never waits for a tick.
#[tracing::instrument(skip(state, payload))]
pub async fn update_event_status(
    State(state): State<AppState>,
    payload: Result<Json<EventStatusRequest>, JsonRejection>,
) -> Result<SuccessResponse<StatusRecord>, ErrorResponse> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected malformed status request");
        ErrorResponse::from(ValidationError::InvalidJson(rejection.body_text()))
    })?;

    let change = request.validate().map_err(|e| {
        tracing::warn!(error = %e, "Rejected invalid status request");
        ErrorResponse::from(e)
    })?;

    let record = state.service.update_event_status(change);
    Ok(SuccessResponse::new(record))
}

/// Current status of every tracked event
#[tracing::instrument(skip(state))]
pub async fn list_event_statuses(
    State(state): State<AppState>,
) -> SuccessResponse<HashMap<String, EventStatus>> {
    SuccessResponse::new(state.service.event_status_map())
}
