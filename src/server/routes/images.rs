//! Image Processing Routes
//!
//! Photo upload plus the AI endpoints built on it: scene understanding,
//! object detection, word definitions, and theme generation. The AI
//! endpoints always answer 200 with a typed payload; provider failures are
//! absorbed by the services.

use std::path::{Component, Path, PathBuf};

use axum::Json;
use axum::extract::{Multipart, State};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::constants::upload;
use crate::server::AppState;
use crate::types::{LingoError, Result, SceneUnderstanding};

#[derive(Debug, Deserialize)]
pub struct ImagePathRequest {
    pub image_path: String,
}

#[derive(Debug, Deserialize)]
pub struct WordRequest {
    pub word: String,
}

#[derive(Debug, Deserialize)]
pub struct ThemesRequest {
    pub understanding: SceneUnderstanding,
}

/// POST /api/upload-image (multipart, field `image`)
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let field = loop {
        match multipart
            .next_field()
            .await
            .map_err(|e| LingoError::validation(format!("invalid multipart body: {e}")))?
        {
            Some(field) if field.name() == Some("image") => break field,
            Some(_) => continue,
            None => return Err(LingoError::validation("No image file provided")),
        }
    };

    let original_name = field
        .file_name()
        .map(str::to_string)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| LingoError::validation("No file selected"))?;

    let extension = Path::new(&original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .filter(|e| upload::ALLOWED_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| LingoError::validation("Invalid file type"))?;

    let bytes = field
        .bytes()
        .await
        .map_err(|e| LingoError::validation(format!("failed to read upload: {e}")))?;
    if bytes.is_empty() {
        return Err(LingoError::validation("uploaded file is empty"));
    }
    if bytes.len() > upload::MAX_IMAGE_BYTES {
        return Err(LingoError::validation("uploaded file is too large"));
    }

    let filename = format!("{}_{}.{extension}", Uuid::new_v4(), sanitize_stem(&original_name));
    let upload_dir = PathBuf::from(&state.config.server.upload_dir);
    tokio::fs::create_dir_all(&upload_dir).await?;

    let filepath = upload_dir.join(&filename);
    tokio::fs::write(&filepath, &bytes).await?;

    Ok(Json(json!({
        "success": true,
        "filepath": filepath.to_string_lossy(),
        "filename": filename,
    })))
}

/// POST /api/understand-image
pub async fn understand_image(
    State(state): State<AppState>,
    Json(request): Json<ImagePathRequest>,
) -> Result<Json<Value>> {
    let image = read_uploaded_image(&state, &request.image_path).await?;
    let understanding = state.recognition.understand_scene(&image).await;
    Ok(Json(json!({"success": true, "understanding": understanding})))
}

/// POST /api/segment-objects
pub async fn segment_objects(
    State(state): State<AppState>,
    Json(request): Json<ImagePathRequest>,
) -> Result<Json<Value>> {
    let image = read_uploaded_image(&state, &request.image_path).await?;
    let objects = state.recognition.detect_objects(&image).await;
    Ok(Json(json!({"success": true, "objects": objects})))
}

/// POST /api/generate-word-info
pub async fn generate_word_info(
    State(state): State<AppState>,
    Json(request): Json<WordRequest>,
) -> Result<Json<Value>> {
    let word = request.word.trim();
    if word.is_empty() {
        return Err(LingoError::validation("Word is required"));
    }
    let word_info = state.recognition.define_word(word).await;
    Ok(Json(json!({"success": true, "word_info": word_info})))
}

/// POST /api/generate-conversation-themes
pub async fn generate_conversation_themes(
    State(state): State<AppState>,
    Json(request): Json<ThemesRequest>,
) -> Result<Json<Value>> {
    let themes = state.conversation.generate_themes(&request.understanding).await;
    Ok(Json(json!({"success": true, "themes": themes})))
}

/// Read a previously uploaded image, rejecting paths that escape the
/// upload directory.
async fn read_uploaded_image(state: &AppState, image_path: &str) -> Result<Vec<u8>> {
    let upload_dir = Path::new(&state.config.server.upload_dir);
    let resolved = resolve_upload_path(upload_dir, image_path)?;

    match tokio::fs::read(&resolved).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LingoError::validation("Invalid image path"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Resolve a client-supplied image path to a file inside `upload_dir`.
///
/// Accepts either a path already under the upload dir or a bare filename
/// as shorthand for one. Everything else is rejected: parent components,
/// absolute paths elsewhere (`Path::join` would replace the base entirely),
/// and relative paths pointing outside the directory.
fn resolve_upload_path(upload_dir: &Path, image_path: &str) -> Result<PathBuf> {
    let path = Path::new(image_path);
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(LingoError::validation("Invalid image path"));
    }

    if path.starts_with(upload_dir) {
        return Ok(path.to_path_buf());
    }
    if path.is_absolute() || path.components().count() > 1 {
        return Err(LingoError::validation("Invalid image path"));
    }
    Ok(upload_dir.join(path))
}

/// Keep only safe characters from the original file stem.
fn sanitize_stem(original: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    // A stem of nothing but replaced characters carries no information
    if cleaned.chars().all(|c| c == '_') {
        "upload".to_string()
    } else {
        cleaned
    }
}
