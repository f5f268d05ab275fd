use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Event Status Models
// ============================================================================

/// Liveness of an externally identified event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Live,
    #[serde(alias = "not live")]
    NotLive,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Live => "live",
            EventStatus::NotLive => "not_live",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(EventStatus::Live),
            // "not live" is the spelling older producers still send
            "not_live" | "not live" => Ok(EventStatus::NotLive),
            other => Err(ValidationError::InvalidFieldValue {
                field: "status".to_string(),
                reason: format!("unknown status '{}', expected 'live' or 'not_live'", other),
            }),
        }
    }
}

/// Latest known status of one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub event_id: String,
    pub status: EventStatus,
}

// ============================================================================
// Inbound Request Models
// ============================================================================

/// Raw status-change request as received on the wire.
///
/// Every field is optional here so that missing fields surface as
/// [`ValidationError`]s instead of opaque deserializer failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStatusRequest {
    pub event_id: Option<String>,
    pub status: Option<String>,
}

/// A validated status change, ready for the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub event_id: String,
    pub status: EventStatus,
}

impl EventStatusRequest {
    /// Check required fields and parse the status value
    pub fn validate(self) -> Result<StatusChange, ValidationError> {
        let event_id = self
            .event_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ValidationError::MissingField("eventId".to_string()))?;

        let status = self
            .status
            .ok_or_else(|| ValidationError::MissingField("status".to_string()))?
            .parse::<EventStatus>()?;

        Ok(StatusChange { event_id, status })
    }
}

// ============================================================================
// External Data & Payload Models
// ============================================================================

/// A single data point fetched from the external source for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSnapshot {
    pub event_id: String,
    pub current_score: String,
}

/// Message body published to the stream: exactly `eventId` and `currentScore`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub event_id: String,
    pub current_score: String,
}

impl EventPayload {
    /// Build the payload for `event_id`. The scheduled identifier wins over
    /// whatever identifier the source echoed back.
    pub fn from_snapshot(event_id: &str, snapshot: ExternalSnapshot) -> Self {
        Self {
            event_id: event_id.to_string(),
            current_score: snapshot.current_score,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
