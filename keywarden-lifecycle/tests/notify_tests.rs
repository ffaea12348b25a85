use chrono::{Duration, Utc};
use keywarden_lifecycle::{notify_mock::RecordingSink, NotificationSink, WebhookConfig, WebhookSink};
use keywarden_types::{KeyEvent, KeyKind, KeyStats};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn issued_event() -> KeyEvent {
    let now = Utc::now();
    KeyEvent::issued("KEY-0001", KeyKind::Temporary, now, Some(now + Duration::minutes(30)))
}

#[tokio::test]
async fn issued_event_posts_a_generated_embed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({
            "embeds": [{
                "title": "Key Generated",
                "fields": [
                    { "name": "Key", "value": "KEY-0001" },
                    { "name": "Type", "value": "temporary" },
                ],
            }]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let sink = WebhookSink::new(WebhookConfig {
        url: format!("{}/", server.uri()),
        ..WebhookConfig::default()
    })
    .unwrap();

    sink.deliver(&issued_event()).await.unwrap();
}

#[tokio::test]
async fn revoked_and_stats_events_render_their_own_embeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "embeds": [{ "title": "Key Deleted" }] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "embeds": [{ "title": "Key Stats" }] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let sink = WebhookSink::new(WebhookConfig {
        url: format!("{}/", server.uri()),
        ..WebhookConfig::default()
    })
    .unwrap();

    let now = Utc::now();
    sink.deliver(&KeyEvent::revoked("KEY-0002", "operator", now))
        .await
        .unwrap();
    sink.deliver(&KeyEvent::stats_snapshot(KeyStats::default(), now))
        .await
        .unwrap();
}

#[tokio::test]
async fn non_success_status_is_a_delivery_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sink = WebhookSink::new(WebhookConfig {
        url: format!("{}/", server.uri()),
        ..WebhookConfig::default()
    })
    .unwrap();

    let err = sink.deliver(&issued_event()).await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_delivery_error() {
    let sink = WebhookSink::new(WebhookConfig {
        url: "http://127.0.0.1:9/hook".to_string(),
        timeout_secs: 1,
    })
    .unwrap();

    assert!(sink.deliver(&issued_event()).await.is_err());
}

#[tokio::test]
async fn empty_url_disables_delivery() {
    let sink = WebhookSink::new(WebhookConfig::default()).unwrap();
    // No endpoint configured: the event is dropped without error.
    sink.deliver(&issued_event()).await.unwrap();
}

#[tokio::test]
async fn recording_sink_keeps_events_in_order() {
    let sink = RecordingSink::new();
    let now = Utc::now();

    sink.deliver(&KeyEvent::revoked("A", "operator", now)).await.unwrap();
    sink.deliver(&KeyEvent::reaped("B", now)).await.unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].key(), Some("A"));
    assert_eq!(events[1].key(), Some("B"));
}

#[tokio::test]
async fn recording_sink_can_be_told_to_fail() {
    let sink = RecordingSink::new();
    sink.set_failing(true);

    let result = sink.deliver(&issued_event()).await;
    assert!(result.is_err());
    assert_eq!(sink.count(), 0);
}
