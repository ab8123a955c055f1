//! End-to-end tests over the HTTP surface with canned AI providers.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use lingowizz::ai::{
    ChatMessage, GenerationOptions, ModelProvider, ObjectDetector, RawModelReply,
};
use lingowizz::config::Config;
use lingowizz::server::{AppState, build_router};
use lingowizz::services::{ConversationService, RecognitionService, VideoSearchService};
use lingowizz::storage::{Database, SessionStore, VocabularyStore};
use lingowizz::types::{DetectedObject, Result};

struct CannedProvider {
    reply: String,
}

#[async_trait]
impl ModelProvider for CannedProvider {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> Result<RawModelReply> {
        Ok(RawModelReply::new(self.reply.clone(), "canned"))
    }

    async fn chat_with_image(
        &self,
        _prompt: &str,
        _image: &[u8],
        _options: &GenerationOptions,
    ) -> Result<RawModelReply> {
        Ok(RawModelReply::new(self.reply.clone(), "canned"))
    }

    fn supports_vision(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "canned"
    }
}

struct EmptyDetector;

#[async_trait]
impl ObjectDetector for EmptyDetector {
    async fn detect(&self, _image: &[u8]) -> Result<Vec<DetectedObject>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "empty"
    }
}

fn test_app(upload_dir: &TempDir, reply: &str) -> Router {
    let mut config = Config::default();
    config.server.upload_dir = upload_dir.path().to_string_lossy().into_owned();

    let db = Arc::new(Database::open_in_memory().unwrap());
    db.initialize().unwrap();

    let chat: Arc<dyn ModelProvider> = Arc::new(CannedProvider {
        reply: reply.to_string(),
    });
    let video = Arc::new(VideoSearchService::new(&config.video).unwrap());
    let state = AppState {
        config: Arc::new(config),
        vocabulary: Arc::new(VocabularyStore::new(db.clone())),
        sessions: Arc::new(SessionStore::new(db)),
        recognition: Arc::new(RecognitionService::new(
            chat.clone(),
            chat.clone(),
            Arc::new(EmptyDetector),
        )),
        conversation: Arc::new(ConversationService::new(chat)),
        video,
    };
    build_router(state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_vocabulary_crud_flow() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, "irrelevant");

    // Add a word
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/vocabulary",
            json!({"word": "kettle", "definition": "A pot for boiling water."}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let id = body["item"]["id"].as_i64().unwrap();

    // Duplicate rejected
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/vocabulary",
            json!({"word": "kettle", "definition": "again"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // List contains it
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/vocabulary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["vocabulary"][0]["word"], "kettle");

    // Update
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/vocabulary/{id}"),
            json!({"definition": "Boils water."}),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["item"]["definition"], "Boils water.");

    // Delete, then 404 on fetch
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/vocabulary/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/vocabulary/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vocabulary_search_requires_query() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, "irrelevant");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/vocabulary/search")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_message_exchange() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, "Bonjour! A kettle boils water.");

    // Create a session from a theme
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/sessions",
            json!({"theme": {"title": "Kitchen Cooking Assistant", "role": "Chef", "background": "Cooking dinner."}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let session_id = body["session"]["session_id"].as_str().unwrap().to_string();

    // Send a message; both turns come back and are persisted
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/sessions/{session_id}/messages"),
            json!({"message": "What is a kettle?"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user_message"]["is_user"], true);
    assert_eq!(body["ai_message"]["message"], "Bonjour! A kettle boils water.");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/sessions/{session_id}/messages"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);

    // Delete cascades
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/sessions/{session_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/sessions/{session_id}/messages"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_word_info_uses_model_reply() {
    let dir = TempDir::new().unwrap();
    let app = test_app(
        &dir,
        r#"{"word": "kettle", "definition": "A pot for boiling water.", "example_sentence": "The kettle whistled.", "pronunciation": "/ket.l/", "part_of_speech": "noun"}"#,
    );

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/generate-word-info",
            json!({"word": "kettle"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["word_info"]["definition"], "A pot for boiling water.");
}

#[tokio::test]
async fn test_upload_then_understand_image() {
    let dir = TempDir::new().unwrap();
    let app = test_app(
        &dir,
        r#"{"description": "A kitchen", "objects": ["pan"], "scene": "kitchen", "mood": "warm"}"#,
    );

    let boundary = "test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"image\"; filename=\"photo.jpg\"\r\n\
         Content-Type: image/jpeg\r\n\r\n\
         fake image bytes\r\n\
         --{boundary}--\r\n"
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload-image")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let upload = body_json(response).await;
    assert_eq!(upload["success"], true);
    let filepath = upload["filepath"].as_str().unwrap().to_string();
    assert!(std::path::Path::new(&filepath).exists());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/understand-image",
            json!({"image_path": filepath}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["understanding"]["scene"], "kitchen");
}

#[tokio::test]
async fn test_understand_image_rejects_path_outside_upload_dir() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, "irrelevant");

    // A readable file that lives outside the upload directory must not be
    // reachable through an absolute image_path.
    let outside = TempDir::new().unwrap();
    let secret = outside.path().join("secret.jpg");
    std::fs::write(&secret, b"not yours").unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/understand-image",
            json!({"image_path": secret.to_string_lossy()}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/understand-image",
            json!({"image_path": "../secret.jpg"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommend_requires_tags() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, "irrelevant");

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/recommend", json!({"tags": []})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Whitespace-only tags count as empty
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/recommend", json!({"tags": ["  "]})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/recommend")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_bad_extension() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, "irrelevant");

    let boundary = "test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"image\"; filename=\"script.sh\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         echo hi\r\n\
         --{boundary}--\r\n"
    );
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload-image")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
