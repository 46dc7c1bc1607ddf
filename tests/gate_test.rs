//! Wiremock integration tests for GeminiLeafGate.
//!
//! These tests verify the HTTP contract and the fail-closed verdict using mocked responses.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use leafcheck::providers::gemini::LEAF_PROMPT;
use leafcheck::{GeminiLeafGate, LeafDetector, LeafError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1/models/gemini-1.5-flash:generateContent";

fn leaf_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 480, Rgb([40, 160, 60])))
}

fn text_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {
                "parts": [{"text": text}],
                "role": "model"
            },
            "finishReason": "STOP"
        }]
    })
}

async fn mount_response(mock_server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test_key"))
        .respond_with(template)
        .mount(mock_server)
        .await;
}

async fn verdict_for_text(text: &str) -> bool {
    let mock_server = MockServer::start().await;
    mount_response(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(text_response(text)),
    )
    .await;

    let gate = GeminiLeafGate::with_base_url("test_key", mock_server.uri()).unwrap();
    gate.is_leaf(&leaf_image()).await
}

/// Test a plain "yes" is a leaf.
#[tokio::test]
async fn test_yes_is_leaf() {
    assert!(verdict_for_text("yes").await);
}

/// Test the substring policy: anything containing "yes" counts.
#[tokio::test]
async fn test_substring_match_policy() {
    assert!(verdict_for_text("Yes, it is.").await);
    assert!(verdict_for_text("maybe yes?").await);
    assert!(!verdict_for_text("no").await);
    assert!(!verdict_for_text("No, this is not a leaf.").await);
}

/// Test the request carries the instruction and an inline JPEG no larger than 300 px.
#[tokio::test]
async fn test_request_body_shape() {
    let mock_server = MockServer::start().await;
    mount_response(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(text_response("yes")),
    )
    .await;

    let gate = GeminiLeafGate::with_base_url("test_key", mock_server.uri()).unwrap();
    assert!(gate.check(&leaf_image()).await.unwrap());

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let parts = &body["contents"][0]["parts"];
    assert_eq!(parts[0]["text"], LEAF_PROMPT);
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");

    let data = parts[1]["inlineData"]["data"].as_str().unwrap();
    assert!(!data.contains('\n'), "base64 must not be line-wrapped");

    let jpeg = STANDARD.decode(data).unwrap();
    assert_eq!(
        image::guess_format(&jpeg).unwrap(),
        image::ImageFormat::Jpeg
    );
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!(decoded.dimensions(), (300, 225));
}

/// Test HTTP 500 yields a verdict of false.
#[tokio::test]
async fn test_server_error_fails_closed() {
    let mock_server = MockServer::start().await;
    mount_response(&mock_server, ResponseTemplate::new(500)).await;

    let gate = GeminiLeafGate::with_base_url("test_key", mock_server.uri()).unwrap();
    let result = gate.check(&leaf_image()).await;
    assert!(
        matches!(result, Err(LeafError::Api { status: 500, .. })),
        "expected Api error, got {:?}",
        result
    );
    assert!(!gate.is_leaf(&leaf_image()).await);
}

/// Test a non-success status is not retried.
#[tokio::test]
async fn test_non_success_is_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gate = GeminiLeafGate::with_base_url("test_key", mock_server.uri()).unwrap();
    assert!(!gate.is_leaf(&leaf_image()).await);
}

/// Test a wrong key (401) fails closed.
#[tokio::test]
async fn test_unauthorized_fails_closed() {
    let mock_server = MockServer::start().await;
    mount_response(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(text_response("yes")),
    )
    .await;
    // no matching header -> wiremock answers 404
    let gate = GeminiLeafGate::with_base_url("wrong_key", mock_server.uri()).unwrap();
    assert!(!gate.is_leaf(&leaf_image()).await);
}

/// Test malformed JSON yields a verdict of false.
#[tokio::test]
async fn test_malformed_json_fails_closed() {
    let mock_server = MockServer::start().await;
    mount_response(
        &mock_server,
        ResponseTemplate::new(200).set_body_string("{not json"),
    )
    .await;

    let gate = GeminiLeafGate::with_base_url("test_key", mock_server.uri()).unwrap();
    let result = gate.check(&leaf_image()).await;
    assert!(matches!(result, Err(LeafError::Json(_))), "got {:?}", result);
    assert!(!gate.is_leaf(&leaf_image()).await);
}

/// Test an empty candidate list yields a verdict of false.
#[tokio::test]
async fn test_empty_candidates_fails_closed() {
    let mock_server = MockServer::start().await;
    mount_response(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})),
    )
    .await;

    let gate = GeminiLeafGate::with_base_url("test_key", mock_server.uri()).unwrap();
    let result = gate.check(&leaf_image()).await;
    assert!(matches!(result, Err(LeafError::EmptyResponse)));
    assert!(!gate.is_leaf(&leaf_image()).await);
}

/// Test a missing candidate list yields a verdict of false.
#[tokio::test]
async fn test_missing_candidates_fails_closed() {
    let mock_server = MockServer::start().await;
    mount_response(
        &mock_server,
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}})),
    )
    .await;

    let gate = GeminiLeafGate::with_base_url("test_key", mock_server.uri()).unwrap();
    assert!(!gate.is_leaf(&leaf_image()).await);
}

/// Test a candidate whose first part has no text yields false.
#[tokio::test]
async fn test_candidate_without_text_fails_closed() {
    let mock_server = MockServer::start().await;
    mount_response(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": [{"inlineData": {}}]}}]
        })),
    )
    .await;

    let gate = GeminiLeafGate::with_base_url("test_key", mock_server.uri()).unwrap();
    let result = gate.check(&leaf_image()).await;
    assert!(matches!(result, Err(LeafError::DataError(_))));
    assert!(!gate.is_leaf(&leaf_image()).await);
}

/// Test a transport failure yields false.
#[tokio::test]
async fn test_transport_failure_fails_closed() {
    // grab a free port and close it again so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let gate = GeminiLeafGate::with_base_url("test_key", uri).unwrap();
    let result = gate.check(&leaf_image()).await;
    assert!(matches!(result, Err(LeafError::Http(_))), "got {:?}", result);
    assert!(!gate.is_leaf(&leaf_image()).await);
}

/// Test a degenerate image never reaches the network.
#[tokio::test]
async fn test_degenerate_image_is_not_sent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("yes")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let gate = GeminiLeafGate::with_base_url("test_key", mock_server.uri()).unwrap();
    let result = gate.check(&DynamicImage::new_rgb8(0, 0)).await;
    assert!(matches!(result, Err(LeafError::InvalidImage(_))));
}
