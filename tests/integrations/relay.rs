//! End-to-end tests: Grafana webhook in, ntfy publish out.

#[path = "../helpers/mod.rs"]
mod helpers;

use anyhow::Result;
use grafana_ntfy::app::App;
use grafana_ntfy::config::Config;
use helpers::app::TestAppBuilder;
use helpers::mock_ntfy::MockNtfySender;
use helpers::{unused_local_addr, FIRING_ALERT_BODY, TEST_NOTIFICATION_BODY};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_firing_alert_is_forwarded_to_ntfy() -> Result<()> {
    // Arrange
    let ntfy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "message": "M",
            "title": "T",
            "topic": "ops",
            "actions": [
                { "action": "view", "label": "Open in Grafana", "url": "http://g/a", "clear": true },
                { "action": "view", "label": "Silence", "url": "http://g/s", "clear": false }
            ]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&ntfy)
        .await;

    let app = TestAppBuilder::new()
        .with_ntfy_url(&format!("{}/ops", ntfy.uri()))
        .start()
        .await?;

    // Act
    let response = app.post("/", FIRING_ALERT_BODY).await;

    // Assert
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "Payload received successfully\n");

    app.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_test_notification_without_alerts_has_no_actions() -> Result<()> {
    let ntfy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "message": "This is a test",
            "title": "[FIRING:1] TestAlert",
            "topic": "ops"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&ntfy)
        .await;

    let app = TestAppBuilder::new()
        .with_ntfy_url(&format!("{}/ops", ntfy.uri()))
        .start()
        .await?;

    let response = app.post("/", TEST_NOTIFICATION_BODY).await;

    assert_eq!(response.status(), 200);
    app.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_priority_hint_is_applied_on_static_route() -> Result<()> {
    let sender = Arc::new(MockNtfySender::new());
    let app = TestAppBuilder::new()
        .with_ntfy_url("https://ntfy.example.com/ops")
        .with_sender(sender.clone())
        .start()
        .await?;

    assert_eq!(app.post("/?priority=1", FIRING_ALERT_BODY).await.status(), 200);
    assert_eq!(app.post("/?priority=7", FIRING_ALERT_BODY).await.status(), 200);

    let priorities: Vec<_> = sender
        .deliveries()
        .iter()
        .map(|d| d.notification.priority)
        .collect();
    assert_eq!(priorities, vec![Some(1), Some(3)]);

    app.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_any_path_is_accepted() -> Result<()> {
    let sender = Arc::new(MockNtfySender::new());
    let app = TestAppBuilder::new()
        .with_ntfy_url("https://ntfy.example.com/ops")
        .with_sender(sender.clone())
        .start()
        .await?;

    let response = app.post("/grafana/webhook", FIRING_ALERT_BODY).await;

    assert_eq!(response.status(), 200);
    assert_eq!(sender.deliveries()[0].endpoint, "https://ntfy.example.com");

    app.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_non_post_methods_are_rejected() -> Result<()> {
    let sender = Arc::new(MockNtfySender::new());
    let app = TestAppBuilder::new()
        .with_ntfy_url("https://ntfy.example.com/ops")
        .with_sender(sender.clone())
        .start()
        .await?;

    let get = app.client.get(app.url("/")).send().await?;
    let put = app
        .client
        .put(app.url("/"))
        .body(FIRING_ALERT_BODY)
        .send()
        .await?;

    assert_eq!(get.status(), 405);
    assert_eq!(get.text().await?, "Invalid request method\n");
    assert_eq!(put.status(), 405);
    assert!(sender.deliveries().is_empty());

    app.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_a_client_error() -> Result<()> {
    let sender = Arc::new(MockNtfySender::new());
    let app = TestAppBuilder::new()
        .with_ntfy_url("https://ntfy.example.com/ops")
        .with_sender(sender.clone())
        .start()
        .await?;

    let response = app.post("/", r#"{"alerts": "not-a-list"}"#).await;

    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await?, "Error parsing JSON payload\n");
    assert!(sender.deliveries().is_empty());

    app.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_ntfy_rejection_is_a_gateway_error() -> Result<()> {
    let ntfy = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&ntfy)
        .await;

    let app = TestAppBuilder::new()
        .with_ntfy_url(&format!("{}/ops", ntfy.uri()))
        .start()
        .await?;

    let response = app.post("/", FIRING_ALERT_BODY).await;

    assert_eq!(response.status(), 502);
    assert_eq!(response.text().await?, "Error sending notification\n");

    app.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_non_200_success_codes_are_failures() -> Result<()> {
    let ntfy = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&ntfy)
        .await;

    let app = TestAppBuilder::new()
        .with_ntfy_url(&format!("{}/ops", ntfy.uri()))
        .start()
        .await?;

    let response = app.post("/", FIRING_ALERT_BODY).await;

    assert_eq!(response.status(), 502);
    app.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_unreachable_ntfy_is_a_transport_failure() -> Result<()> {
    let ntfy_url = format!("http://{}/ops", unused_local_addr());
    let app = TestAppBuilder::new()
        .with_ntfy_url(&ntfy_url)
        .with_metrics()
        .start()
        .await?;
    let metrics_addr = app.metrics_addr.expect("metrics server should be running");

    let response = app.post("/", FIRING_ALERT_BODY).await;

    assert_eq!(response.status(), 502);
    assert_eq!(response.text().await?, "Error sending notification\n");

    let metrics = app
        .client
        .get(format!("http://{metrics_addr}/metrics"))
        .send()
        .await?
        .text()
        .await?;
    assert!(
        metrics.contains(r#"notifications_failed_total{reason="transport"} 1"#),
        "{metrics}"
    );

    app.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_static_credentials_are_sent_as_basic_auth() -> Result<()> {
    let ntfy = MockServer::start().await;
    // base64("alice:s3cret")
    Mock::given(method("POST"))
        .and(header("authorization", "Basic YWxpY2U6czNjcmV0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&ntfy)
        .await;

    let app = TestAppBuilder::new()
        .with_ntfy_url(&format!("{}/ops", ntfy.uri()))
        .with_credentials("alice", "s3cret")
        .start()
        .await?;

    let response = app.post("/", FIRING_ALERT_BODY).await;

    assert_eq!(response.status(), 200);
    app.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_forwarded_authorization_wins_over_static_credentials() -> Result<()> {
    let ntfy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer tk_caller"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&ntfy)
        .await;

    let app = TestAppBuilder::new()
        .with_ntfy_url(&format!("{}/ops", ntfy.uri()))
        .with_credentials("alice", "s3cret")
        .start()
        .await?;

    let response = app
        .client
        .post(app.url("/"))
        .header("authorization", "Bearer tk_caller")
        .body(FIRING_ALERT_BODY)
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    app.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_invalid_static_ntfy_url_fails_startup() {
    let config = Config {
        ntfy_url: Some("https://ntfy.sh/".to_string()),
        ..Default::default()
    };
    let (_shutdown_tx, shutdown_rx) = watch::channel(());

    let result = App::builder(config).build(shutdown_rx).await;

    let err = result.err().expect("startup should fail");
    assert!(format!("{:#}", err).contains("Error parsing ntfy-url"));
}
