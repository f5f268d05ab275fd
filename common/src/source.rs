// External data source: fetches the current snapshot for one event

use crate::errors::FetchError;
use crate::models::ExternalSnapshot;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, instrument};

/// Source of per-event snapshots
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, event_id: &str) -> Result<ExternalSnapshot, FetchError>;
}

/// Fetches `GET {base_url}/{event_id}` and decodes the JSON body
pub struct HttpSnapshotSource {
    client: Client,
    base_url: Url,
    timeout_seconds: u64,
}

impl HttpSnapshotSource {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            timeout_seconds,
        })
    }

    /// URL for `event_id`, with the identifier percent-encoded as one segment
    pub fn url_for(&self, event_id: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(event_id);
        Ok(url)
    }

    fn map_send_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout_seconds)
        } else {
            FetchError::from(err)
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    #[instrument(skip(self))]
    async fn fetch(&self, event_id: &str) -> Result<ExternalSnapshot, FetchError> {
        let url = self.url_for(event_id)?;
        debug!(url = %url, "Calling external API");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                event_id: event_id.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        let snapshot: ExternalSnapshot =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))?;

        debug!(current_score = %snapshot.current_score, "External API responded");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_appends_event_id() {
        let source = HttpSnapshotSource::new("http://localhost:8081/mock", 5).unwrap();
        assert_eq!(
            source.url_for("abc").unwrap().as_str(),
            "http://localhost:8081/mock/abc"
        );
    }

    #[test]
    fn test_url_handles_trailing_slash_and_encoding() {
        let source = HttpSnapshotSource::new("http://localhost:8081/mock/", 5).unwrap();
        assert_eq!(
            source.url_for("a b/c").unwrap().as_str(),
            "http://localhost:8081/mock/a%20b%2Fc"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpSnapshotSource::new("not a url", 5),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpSnapshotSource::new("mailto:someone@example.com", 5),
            Err(FetchError::InvalidUrl(_))
        ));
    }
}
