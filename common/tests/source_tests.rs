// HTTP snapshot source tests against a mock external API

use common::errors::FetchError;
use common::source::{HttpSnapshotSource, SnapshotSource};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_decodes_snapshot() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mock/E1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "eventId": "E1",
            "currentScore": "2:1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = HttpSnapshotSource::new(&format!("{}/mock", mock_server.uri()), 5).unwrap();
    let snapshot = source.fetch("E1").await.unwrap();

    assert_eq!(snapshot.event_id, "E1");
    assert_eq!(snapshot.current_score, "2:1");
    mock_server.verify().await;
}

#[tokio::test]
async fn test_fetch_reports_non_success_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mock/E1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let source = HttpSnapshotSource::new(&format!("{}/mock", mock_server.uri()), 5).unwrap();
    let err = source.fetch("E1").await.unwrap_err();

    assert!(matches!(
        err,
        FetchError::UnexpectedStatus { status: 503, .. }
    ));
}

#[tokio::test]
async fn test_fetch_reports_malformed_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mock/E1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"eventId\": 42"))
        .mount(&mock_server)
        .await;

    let source = HttpSnapshotSource::new(&format!("{}/mock", mock_server.uri()), 5).unwrap();
    let err = source.fetch("E1").await.unwrap_err();

    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn test_fetch_times_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mock/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"eventId": "slow", "currentScore": "0:0"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let source = HttpSnapshotSource::new(&format!("{}/mock", mock_server.uri()), 1).unwrap();
    let err = source.fetch("slow").await.unwrap_err();

    assert!(matches!(err, FetchError::Timeout(1)));
}

#[tokio::test]
async fn test_fetch_reports_connection_failure() {
    // Nothing listens on port 9 locally
    let source = HttpSnapshotSource::new("http://127.0.0.1:9/mock", 2).unwrap();
    let err = source.fetch("E1").await.unwrap_err();

    assert!(matches!(err, FetchError::Transport(_) | FetchError::Timeout(_)));
}
