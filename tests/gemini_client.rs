//! Gemini client behaviour against a mock HTTP server.

use gemini_edit::{
    EditError, EditRequest, EditorController, EditorView, GeminiEditor, GeminiModel, ImageEditor,
    Phase, UploadedImage,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FLASH_PATH: &str = "/v1beta/models/gemini-2.5-flash-image:generateContent";

fn editor(server: &MockServer) -> GeminiEditor {
    GeminiEditor::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .env_fallback(false)
        .build()
        .unwrap()
}

fn image_response(data: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "parts": [{"inlineData": {"mimeType": "image/png", "data": data}}]
            },
            "finishReason": "STOP"
        }]
    })
}

fn request() -> EditRequest {
    EditRequest::new("/9j/4AAQ", "image/jpeg", "add a hat")
}

#[tokio::test]
async fn test_edit_sends_inline_image_and_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_json(json!({
            "contents": [{
                "parts": [
                    {"inlineData": {"mimeType": "image/jpeg", "data": "/9j/4AAQ"}},
                    {"text": "add a hat"}
                ]
            }],
            "generationConfig": {"responseModalities": ["IMAGE"]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("iVBORw0KGgo=")))
        .expect(1)
        .mount(&server)
        .await;

    let image = editor(&server).edit(&request()).await.unwrap();
    assert_eq!(image.base64, "iVBORw0KGgo=");
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(
        image.metadata.model.as_deref(),
        Some(GeminiModel::NanoBanana.as_str())
    );
    assert!(image.metadata.duration_ms.is_some());
}

#[tokio::test]
async fn test_rate_limit_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_json(json!({
                    "error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}
                })),
        )
        .mount(&server)
        .await;

    let err = editor(&server).edit(&request()).await.unwrap_err();
    match err {
        EditError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(std::time::Duration::from_secs(7)));
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
    assert_eq!(
        EditError::RateLimited { retry_after: None }.user_message(),
        "API rate limit exceeded. Please try again later."
    );
}

#[tokio::test]
async fn test_permission_denied_maps_to_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Permission denied", "status": "PERMISSION_DENIED"}
        })))
        .mount(&server)
        .await;

    let err = editor(&server).edit(&request()).await.unwrap_err();
    assert!(matches!(err, EditError::Auth(ref m) if m == "Permission denied"));
}

#[tokio::test]
async fn test_server_error_maps_to_generic_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = editor(&server).edit(&request()).await.unwrap_err();
    assert!(matches!(err, EditError::Api { status: 500, .. }));
    assert_eq!(
        err.user_message(),
        "Failed to generate image due to an API error."
    );
}

#[tokio::test]
async fn test_text_only_response_is_no_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "I cannot edit this image."}]},
                "finishReason": "STOP"
            }]
        })))
        .mount(&server)
        .await;

    let err = editor(&server).edit(&request()).await.unwrap_err();
    assert!(matches!(err, EditError::NoImage));
}

#[tokio::test]
async fn test_malformed_body_is_json_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = editor(&server).edit(&request()).await.unwrap_err();
    assert!(matches!(err, EditError::Json(_)));
}

#[tokio::test]
async fn test_missing_key_fails_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("AAAA")))
        .expect(0)
        .mount(&server)
        .await;

    let keyless = GeminiEditor::builder()
        .base_url(server.uri())
        .env_fallback(false)
        .build()
        .unwrap();
    let err = keyless.edit(&request()).await.unwrap_err();
    assert!(matches!(err, EditError::Config(_)));
    assert!(matches!(
        keyless.health_check().await,
        Err(EditError::Config(_))
    ));
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/gemini-3-pro-image-preview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "models/gemini-3-pro-image-preview"})))
        .mount(&server)
        .await;

    let pro = GeminiEditor::builder()
        .api_key("test-key")
        .model(GeminiModel::NanoBananaPro)
        .base_url(server.uri())
        .env_fallback(false)
        .build()
        .unwrap();
    pro.health_check().await.unwrap();

    // Unknown model on this server
    let flash = editor(&server);
    assert!(matches!(
        flash.health_check().await,
        Err(EditError::Api { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_health_check_rejected_key_maps_to_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/gemini-2.5-flash-image"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": 401, "message": "API key not valid", "status": "UNAUTHENTICATED"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/gemini-3-pro-image-preview"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = editor(&server).health_check().await.unwrap_err();
    assert!(matches!(err, EditError::Auth(_)));
    assert!(err.user_message().starts_with("Invalid or missing API Key"));

    let pro = GeminiEditor::builder()
        .api_key("test-key")
        .model(GeminiModel::NanoBananaPro)
        .base_url(server.uri())
        .env_fallback(false)
        .build()
        .unwrap();
    assert!(matches!(pro.health_check().await, Err(EditError::Auth(_))));
}

#[tokio::test]
async fn test_reported_mime_type_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "parts": [{"inlineData": {"mimeType": "image/jpeg", "data": "/9j/4AAQ"}}]
                },
                "finishReason": "STOP"
            }]
        })))
        .mount(&server)
        .await;

    let controller = EditorController::new(editor(&server));
    controller
        .select_data_url("photo.png", "data:image/png;base64,iVBORw0KGgo=")
        .unwrap();
    controller.set_prompt("add a hat");
    let image = controller.generate().await.unwrap();
    assert_eq!(image.mime_type, "image/jpeg");

    let view = EditorView::render(&controller.state());
    assert_eq!(
        view.edited.data_url(),
        Some("data:image/jpeg;base64,/9j/4AAQ")
    );
}

/// Upload `photo.jpg`, prompt "add a hat", provider returns one image part.
#[tokio::test]
async fn test_photo_with_hat_scenario() {
    let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    let photo = UploadedImage::from_bytes("photo.jpg", &jpeg).unwrap();
    assert_eq!(photo.mime_type, "image/jpeg");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .and(body_json(json!({
            "contents": [{
                "parts": [
                    {"inlineData": {"mimeType": "image/jpeg", "data": photo.base64.clone()}},
                    {"text": "add a hat"}
                ]
            }],
            "generationConfig": {"responseModalities": ["IMAGE"]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("iVBORw0KGgo=")))
        .expect(1)
        .mount(&server)
        .await;

    let controller = EditorController::new(editor(&server));
    controller.select_uploaded(photo).unwrap();
    controller.set_prompt("add a hat");
    let _ = controller.generate().await.unwrap();

    let state = controller.state();
    assert_eq!(state.phase, Phase::Success);
    assert!(!state.is_loading);
    assert!(state.error_message.is_none());

    let view = EditorView::render(&state);
    assert_eq!(
        view.edited.data_url(),
        Some("data:image/png;base64,iVBORw0KGgo=")
    );
    assert!(view.error_banner.is_none());
    assert!(view.generate.enabled);
}
