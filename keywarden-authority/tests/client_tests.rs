use keywarden_authority::{
    mock::MockAuthority, AuthorityConfig, AuthorityError, HttpAuthority, KeyAuthority,
    RevokeOutcome,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpAuthority {
    HttpAuthority::new(AuthorityConfig {
        base_url: server.uri(),
        timeout_secs: 5,
    })
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn config_default_has_no_base_url() {
    let cfg = AuthorityConfig::default();
    assert!(cfg.base_url.is_empty());
    assert_eq!(cfg.timeout_secs, 30);
}

#[test]
fn base_url_trailing_slashes_are_trimmed() {
    let client = HttpAuthority::new(AuthorityConfig {
        base_url: "http://example.invalid/api//".to_string(),
        timeout_secs: 5,
    });
    assert_eq!(client.base_url(), "http://example.invalid/api");
}

// ── issue ───────────────────────────────────────────────────────

#[tokio::test]
async fn issue_returns_the_minted_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/genkey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "key": "AAAA-BBBB" })))
        .mount(&server)
        .await;

    let key = client_for(&server).issue().await.unwrap();
    assert_eq!(key, "AAAA-BBBB");
}

#[tokio::test]
async fn issue_maps_server_errors_to_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/genkey"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).issue().await.unwrap_err();
    assert!(matches!(err, AuthorityError::Unavailable(_)));
}

#[tokio::test]
async fn issue_maps_client_errors_to_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/genkey"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let err = client_for(&server).issue().await.unwrap_err();
    assert!(matches!(err, AuthorityError::Rejected(_)));
}

#[tokio::test]
async fn issue_network_failure_is_unavailable() {
    // Nothing listens on this port.
    let client = HttpAuthority::new(AuthorityConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 1,
    });

    let err = client.issue().await.unwrap_err();
    assert!(matches!(err, AuthorityError::Unavailable(_)));
}

#[tokio::test]
async fn issue_garbage_body_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/genkey"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).issue().await.unwrap_err();
    assert!(matches!(err, AuthorityError::Unavailable(_)));
}

// ── revoke ──────────────────────────────────────────────────────

#[tokio::test]
async fn revoke_sends_the_key_and_reports_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/deletekey"))
        .and(body_json(json!({ "key": "AAAA-BBBB" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let outcome = client_for(&server).revoke("AAAA-BBBB").await.unwrap();
    assert_eq!(outcome, RevokeOutcome::Revoked);
}

#[tokio::test]
async fn revoke_404_surfaces_not_found_without_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/deletekey"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let outcome = client_for(&server).revoke("GONE").await.unwrap();
    assert_eq!(outcome, RevokeOutcome::NotFound);
}

#[tokio::test]
async fn revoke_body_failure_is_rejected_with_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/deletekey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "key is locked"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).revoke("AAAA").await.unwrap_err();
    match err {
        AuthorityError::Rejected(message) => assert_eq!(message, "key is locked"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn revoke_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/deletekey"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client_for(&server).revoke("AAAA").await.unwrap_err();
    assert!(matches!(err, AuthorityError::Unavailable(_)));
}

// ── reset_binding ───────────────────────────────────────────────

#[tokio::test]
async fn reset_binding_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resethwid"))
        .and(body_json(json!({ "key": "AAAA" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    client_for(&server).reset_binding("AAAA").await.unwrap();
}

#[tokio::test]
async fn reset_binding_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resethwid"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server).reset_binding("GONE").await.unwrap_err();
    assert!(matches!(err, AuthorityError::NotFound));
}

#[tokio::test]
async fn reset_binding_400_is_invalid_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resethwid"))
        .respond_with(ResponseTemplate::new(400).set_body_string("key not bound"))
        .mount(&server)
        .await;

    let err = client_for(&server).reset_binding("BAD").await.unwrap_err();
    match err {
        AuthorityError::InvalidKey(message) => assert!(message.contains("key not bound")),
        other => panic!("unexpected error: {other:?}"),
    }
}

// ── fetch_stats ─────────────────────────────────────────────────

#[tokio::test]
async fn fetch_stats_parses_counts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 120,
            "bound": 90,
            "unbound": 30
        })))
        .mount(&server)
        .await;

    let stats = client_for(&server).fetch_stats().await.unwrap();
    assert_eq!(stats.total, 120);
    assert_eq!(stats.bound, 90);
    assert_eq!(stats.unbound, 30);
}

#[tokio::test]
async fn fetch_stats_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_stats().await.unwrap_err();
    assert!(matches!(err, AuthorityError::Unavailable(_)));
}

// ── MockAuthority ───────────────────────────────────────────────

#[tokio::test]
async fn mock_issues_sequential_keys_and_records_calls() {
    let mock = MockAuthority::new();
    let first = mock.issue().await.unwrap();
    let second = mock.issue().await.unwrap();

    assert_eq!(first, "KEY-0001");
    assert_eq!(second, "KEY-0002");
    assert_eq!(mock.issued(), vec!["KEY-0001", "KEY-0002"]);
}

#[tokio::test]
async fn mock_consumes_queued_results_before_defaults() {
    let mock = MockAuthority::new();
    mock.push_revoke_result(Ok(RevokeOutcome::NotFound));
    mock.push_revoke_result(Err(AuthorityError::Unavailable("down".to_string())));

    assert_eq!(mock.revoke("A").await.unwrap(), RevokeOutcome::NotFound);
    assert!(mock.revoke("B").await.is_err());
    // Queue drained; back to the default.
    assert_eq!(mock.revoke("C").await.unwrap(), RevokeOutcome::Revoked);
    assert_eq!(mock.revoked(), vec!["A", "B", "C"]);
}
