// Integration tests for the live event poller
// These tests drive the full pipeline: status change → scheduler → HTTP fetch → publish

use async_trait::async_trait;
use common::bootstrap;
use common::config::Settings;
use common::errors::QueueError;
use common::models::{EventStatus, EventStatusRequest};
use common::queue::{MessageSink, OutboundMessage, EVENT_ID_HEADER};
use common::service::EventStatusService;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sink that keeps every message it is given
#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<OutboundMessage>>,
}

impl RecordingSink {
    fn messages_for(&self, key: &str) -> Vec<OutboundMessage> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.key == key)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, message: OutboundMessage) -> Result<(), QueueError> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

/// Mock external API answering every event with the given score
async fn external_api(score: &str) -> MockServer {
    let server = MockServer::start().await;
    for event_id in ["E1", "E2"] {
        Mock::given(method("GET"))
            .and(path(format!("/mock/{}", event_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "eventId": event_id,
                "currentScore": score,
            })))
            .mount(&server)
            .await;
    }
    server
}

fn test_settings(server: &MockServer) -> Settings {
    let mut settings = Settings::default();
    settings.external_api.base_url = format!("{}/mock", server.uri());
    settings.scheduler.poll_interval_seconds = 1;
    settings.publisher.base_delay_ms = 10;
    settings
}

fn submit(service: &EventStatusService, json: &str) {
    let request: EventStatusRequest = serde_json::from_str(json).unwrap();
    service.update_event_status(request.validate().unwrap());
}

async fn fetches_for(server: &MockServer, event_id: &str) -> usize {
    let expected = format!("/mock/{}", event_id);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == expected)
        .count()
}

#[tokio::test]
async fn test_live_then_not_live_end_to_end() {
    let server = external_api("3:2").await;
    let settings = test_settings(&server);
    let sink = Arc::new(RecordingSink::default());
    let source = bootstrap::init_snapshot_source(&settings).unwrap();
    let service = bootstrap::build_service(&settings, source, sink.clone());

    submit(&service, r#"{"eventId":"E1","status":"live"}"#);
    sleep(Duration::from_millis(500)).await;

    assert_eq!(fetches_for(&server, "E1").await, 1);
    let messages = sink.messages_for("E1");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].topic, settings.publisher.topic);
    assert_eq!(
        messages[0].payload,
        br#"{"eventId":"E1","currentScore":"3:2"}"#.to_vec()
    );

    submit(&service, r#"{"eventId":"E1","status":"not_live"}"#);
    assert_eq!(service.find_status("E1"), Some(EventStatus::NotLive));

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(sink.messages_for("E1").len(), 1);
    assert_eq!(fetches_for(&server, "E1").await, 1);

    service.scheduler().shutdown().await;
}

#[tokio::test]
async fn test_events_are_polled_independently() {
    let server = external_api("1:1").await;
    let settings = test_settings(&server);
    let sink = Arc::new(RecordingSink::default());
    let source = bootstrap::init_snapshot_source(&settings).unwrap();
    let service = bootstrap::build_service(&settings, source, sink.clone());

    submit(&service, r#"{"eventId":"E1","status":"live"}"#);
    submit(&service, r#"{"eventId":"E2","status":"live"}"#);
    sleep(Duration::from_millis(300)).await;
    submit(&service, r#"{"eventId":"E1","status":"not_live"}"#);

    sleep(Duration::from_millis(1200)).await;

    assert_eq!(sink.messages_for("E1").len(), 1);
    assert_eq!(sink.messages_for("E2").len(), 2);
    assert_eq!(service.scheduler().scheduled_events(), vec!["E2".to_string()]);

    service.scheduler().shutdown().await;
}

#[tokio::test]
async fn test_unreachable_external_api_keeps_polling() {
    let mut settings = Settings::default();
    // Nothing listens on port 9 locally
    settings.external_api.base_url = "http://127.0.0.1:9/mock".to_string();
    settings.external_api.timeout_seconds = 1;
    settings.scheduler.poll_interval_seconds = 1;

    let sink = Arc::new(RecordingSink::default());
    let source = bootstrap::init_snapshot_source(&settings).unwrap();
    let service = bootstrap::build_service(&settings, source, sink.clone());

    submit(&service, r#"{"eventId":"E1","status":"live"}"#);
    sleep(Duration::from_millis(1300)).await;

    assert!(service.scheduler().is_scheduled("E1"));
    assert!(sink.messages_for("E1").is_empty());

    service.scheduler().shutdown().await;
}

#[tokio::test]
#[ignore] // Requires a NATS server with JetStream at NATS_URL
async fn test_payload_reaches_nats_stream() {
    let server = external_api("4:0").await;
    let mut settings = test_settings(&server);
    settings.nats.url =
        std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());
    settings.publisher.topic = "event-status-it".to_string();
    settings.nats.stream_name = "EVENT_STATUS_IT".to_string();

    let client = async_nats::connect(&settings.nats.url).await.unwrap();
    let mut subscriber = client
        .subscribe(settings.publisher.topic.clone())
        .await
        .unwrap();

    let sink = bootstrap::init_nats_sink(&settings).await.unwrap();
    let source = bootstrap::init_snapshot_source(&settings).unwrap();
    let service = bootstrap::build_service(&settings, source, sink);

    submit(&service, r#"{"eventId":"E1","status":"live"}"#);

    let message = tokio::time::timeout(Duration::from_secs(5), subscriber.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        message.payload.as_ref(),
        br#"{"eventId":"E1","currentScore":"4:0"}"#
    );
    let key = message
        .headers
        .as_ref()
        .and_then(|h| h.get(EVENT_ID_HEADER))
        .map(|v| v.as_str().to_string());
    assert_eq!(key.as_deref(), Some("E1"));

    service.scheduler().shutdown().await;
}
