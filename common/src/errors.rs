// Error handling framework
// Inbound validation errors are surfaced; everything else is logged inside the core.

use thiserror::Error;

/// Validation errors raised at the inbound boundary, before the core is reached
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
}

/// Errors raised while fetching a snapshot from the external data source
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("External API returned status {status} for event {event_id}")]
    UnexpectedStatus { event_id: String, status: u16 },

    #[error("Failed to decode external API response: {0}")]
    Decode(String),

    #[error("External API request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid external API URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Queue-related errors
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to connect to queue: {0}")]
    Connection(String),

    #[error("Failed to create stream: {0}")]
    StreamCreation(String),

    #[error("Failed to publish message: {0}")]
    PublishFailed(String),

    #[error("Queue operation timeout: {0}")]
    Timeout(String),
}

/// Scheduling errors. Logged and swallowed by the scheduler, never returned to callers.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Scheduler has been shut down; refusing to schedule event {0}")]
    ShutDown(String),

    #[error("No async runtime available to schedule event {event_id}: {reason}")]
    RuntimeUnavailable { event_id: String, reason: String },

    #[error("Job task for event {event_id} ended abnormally: {reason}")]
    JobPanicked { event_id: String, reason: String },
}

/// API response error type for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let details = match &err {
            ValidationError::MissingField(field)
            | ValidationError::InvalidFieldValue { field, .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            ValidationError::InvalidJson(_) => None,
        };
        let api_err = ApiError::new("VALIDATION_ERROR", err.to_string());
        match details {
            Some(details) => api_err.with_details(details),
            None => api_err,
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::InvalidJson(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::MissingField("eventId".to_string());
        assert_eq!(err.to_string(), "Missing required field: eventId");
    }

    #[test]
    fn test_fetch_error_timeout() {
        let err = FetchError::Timeout(5);
        assert!(err.to_string().contains("5 seconds"));
    }

    #[test]
    fn test_validation_error_to_api_error_carries_field() {
        let err = ValidationError::InvalidFieldValue {
            field: "status".to_string(),
            reason: "unknown value".to_string(),
        };
        let api_err: ApiError = err.into();
        assert_eq!(api_err.code, "VALIDATION_ERROR");
        assert_eq!(
            api_err.details,
            Some(serde_json::json!({ "field": "status" }))
        );
    }

    #[test]
    fn test_invalid_json_has_no_details() {
        let api_err: ApiError = ValidationError::InvalidJson("eof".to_string()).into();
        assert!(api_err.details.is_none());
    }
}
