//! Integration tests for the prompting-web server.
//!
//! These tests start a real axum server on a random port and exercise the
//! REST endpoints against a live panel.

use std::sync::Arc;

use prompting::panel::provider::{DefinitionProvider, QueuedDefinitionProvider};
use prompting::prelude::*;
use prompting_web::{PanelHandle, WebConfig, WsMessage, spawn_web};
use serde_json::json;

fn definition(years: &[&str], selected: &[&str]) -> ParameterDefinition {
    ParameterDefinition::new().with_group(
        ParameterGroup::new("filters")
            .with_parameter(Parameter::new("year").with_choices(years, selected))
            .with_parameter(
                Parameter::new("lines")
                    .with_multi_select(true)
                    .with_choices(&["cars", "ships", "planes"], &["cars"]),
            ),
    )
}

/// Helper: spawn a test server on port 0 (random available port).
async fn spawn_test_server(
    provider: Option<Arc<dyn DefinitionProvider>>,
) -> (String, PanelHandle) {
    let panel = PromptPanel::new(
        "prompt",
        definition(&["2024", "2025"], &["2024"]),
        PanelConfig::default().with_guid("web"),
    )
    .unwrap();
    let config = WebConfig {
        bind_addr: ([127, 0, 0, 1], 0).into(),
        ..Default::default()
    };
    let (addr, handle) = spawn_web(panel, provider, config).await.unwrap();
    (format!("http://{addr}"), handle)
}

async fn post(url: String, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new().post(url).json(&body).send().await.unwrap()
}

// ── State ────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_state_returns_the_initialized_panel() {
    let (base, _handle) = spawn_test_server(None).await;

    let resp = reqwest::get(format!("{base}/api/state")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["panel"]["state"], "initialized");
    assert_eq!(json["panel"]["guid"], "web");
    assert_eq!(json["panel"]["values"]["year"], "2024");
    assert_eq!(json["panel"]["values"]["lines"], json!(["cars"]));
    assert_eq!(json["panel"]["tree"]["name"], "promptweb");
}

// ── Parameters ───────────────────────────────────────────────────────

#[tokio::test]
async fn parameter_change_applies_the_provider_definition() {
    let provider = QueuedDefinitionProvider::new()
        .with_definition(definition(&["2024", "2025", "2026"], &["2025"]));
    let (base, handle) = spawn_test_server(Some(Arc::new(provider))).await;

    let resp = post(
        format!("{base}/api/parameter"),
        json!({"name": "year", "value": "2025"}),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["outcome"], "applied");

    let panel = handle.snapshot().panel.unwrap();
    assert_eq!(panel.values["year"], "2025");
    assert!(panel.tree.unwrap().outline().contains("2026"));
}

#[tokio::test]
async fn parameter_change_without_provider_is_skipped() {
    let (base, handle) = spawn_test_server(None).await;

    let resp = post(
        format!("{base}/api/parameter"),
        json!({"name": "lines", "value": ["ships", "planes"]}),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["outcome"], "skipped");

    let panel = handle.snapshot().panel.unwrap();
    assert_eq!(panel.values["lines"], json!(["ships", "planes"]));
}

#[tokio::test]
async fn unknown_parameter_is_404() {
    let (base, _handle) = spawn_test_server(None).await;
    let resp = post(
        format!("{base}/api/parameter"),
        json!({"name": "nope", "value": "x"}),
    )
    .await;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unknown parameter 'nope'");
}

#[tokio::test]
async fn failed_fetch_is_502_and_alerts() {
    let provider = QueuedDefinitionProvider::new().with_failure("server down");
    let (base, handle) = spawn_test_server(Some(Arc::new(provider))).await;
    let mut events = handle.subscribe();

    let resp = post(
        format!("{base}/api/parameter"),
        json!({"name": "year", "value": "2025"}),
    )
    .await;
    assert_eq!(resp.status(), 502);

    let mut alerted = false;
    while let Ok(msg) = events.try_recv() {
        if let WsMessage::Alert { message } = msg {
            assert!(message.contains("server down"));
            alerted = true;
        }
    }
    assert!(alerted);
    // The tree still shows the old choices.
    let tree = handle.snapshot().panel.unwrap().tree.unwrap().outline();
    assert!(!tree.contains("2026"));
}

// ── Refresh ──────────────────────────────────────────────────────────

#[tokio::test]
async fn post_refresh_updates_the_live_tree() {
    let (base, handle) = spawn_test_server(None).await;

    let next = definition(&["2024"], &["2024"]);
    let resp = post(format!("{base}/api/refresh"), json!({ "definition": next })).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["outcome"], "applied");

    let outline = handle.snapshot().panel.unwrap().tree.unwrap().outline();
    assert!(!outline.contains("2025"));
}

#[tokio::test]
async fn malformed_refresh_is_rejected_by_the_extractor() {
    let (base, _handle) = spawn_test_server(None).await;
    let resp = post(
        format!("{base}/api/refresh"),
        json!({"definition": {"parameterGroups": 3}}),
    )
    .await;
    assert!(resp.status().is_client_error());
}

// ── Submit, focus, scroll ────────────────────────────────────────────

#[tokio::test]
async fn post_submit_broadcasts_and_counts() {
    let (base, handle) = spawn_test_server(None).await;
    let before = handle.snapshot().submits;
    let mut events = handle.subscribe();

    let resp = reqwest::Client::new()
        .post(format!("{base}/api/submit"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let mut seen = Vec::new();
    while let Ok(msg) = events.try_recv() {
        seen.push(msg);
    }
    assert!(seen.contains(&WsMessage::SubmitStart));
    assert!(seen.contains(&WsMessage::Submit { is_init: false }));
    assert_eq!(handle.snapshot().submits, before + 1);
}

#[tokio::test]
async fn focus_marks_the_widget() {
    let (base, handle) = spawn_test_server(None).await;

    let resp = post(format!("{base}/api/focus"), json!({"parameter": "lines"})).await;
    assert_eq!(resp.status(), 204);
    let resp = post(format!("{base}/api/focus"), json!({"parameter": "nope"})).await;
    assert_eq!(resp.status(), 404);

    let json = handle.snapshot().to_json();
    assert!(json.to_string().contains(r#""focused":true"#));
}

#[tokio::test]
async fn scroll_checks_the_component() {
    let (base, _handle) = spawn_test_server(None).await;

    let resp = post(
        format!("{base}/api/scroll"),
        json!({"component": "promptweb", "offset": 120}),
    )
    .await;
    assert_eq!(resp.status(), 204);

    let resp = post(
        format!("{base}/api/scroll"),
        json!({"component": "missing", "offset": 1}),
    )
    .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn handle_survives_concurrent_requests() {
    let (_base, handle) = spawn_test_server(None).await;

    let a = handle.set_parameter("year", StoredValue::Single("2025".into()));
    let b = handle.set_parameter("lines", StoredValue::Single("planes".into()));
    let c = handle.submit();
    let (a, b, c) = tokio::join!(a, b, c);
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    let panel = handle.snapshot().panel.unwrap();
    assert_eq!(panel.values["year"], "2025");
    assert_eq!(panel.values["lines"], json!(["planes"]));
}
