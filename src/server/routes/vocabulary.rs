//! Vocabulary Book Routes
//!
//! CRUD, search, and export over the saved words.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::constants::paging;
use crate::server::AppState;
use crate::storage::{NewVocabularyItem, VocabularyUpdate};
use crate::types::{LingoError, Result};

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// GET /api/vocabulary
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>> {
    let page = state.vocabulary.list(
        params.page.unwrap_or(paging::DEFAULT_PAGE),
        params.per_page.unwrap_or(paging::DEFAULT_PER_PAGE),
    )?;
    Ok(Json(json!({
        "success": true,
        "vocabulary": page.items,
        "total": page.total,
        "pages": page.pages,
        "current_page": page.current_page,
    })))
}

/// POST /api/vocabulary
pub async fn add(
    State(state): State<AppState>,
    Json(new): Json<NewVocabularyItem>,
) -> Result<(StatusCode, Json<Value>)> {
    let item = state.vocabulary.insert(&new)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "item": item})),
    ))
}

/// GET /api/vocabulary/{id}
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let item = state.vocabulary.get(id)?;
    Ok(Json(json!({"success": true, "item": item})))
}

/// PUT /api/vocabulary/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<VocabularyUpdate>,
) -> Result<Json<Value>> {
    let item = state.vocabulary.update(id, &update)?;
    Ok(Json(json!({"success": true, "item": item})))
}

/// DELETE /api/vocabulary/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    state.vocabulary.delete(id)?;
    Ok(Json(json!({
        "success": true,
        "message": "Vocabulary item deleted successfully",
    })))
}

/// GET /api/vocabulary/search?q=...
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| LingoError::validation("Search query is required"))?;

    let results = state.vocabulary.search(query)?;
    let count = results.len();
    Ok(Json(json!({
        "success": true,
        "results": results,
        "count": count,
    })))
}

/// GET /api/vocabulary/export
pub async fn export(State(state): State<AppState>) -> Result<Json<Value>> {
    let items = state.vocabulary.export()?;
    let total = items.len();
    Ok(Json(json!({
        "success": true,
        "vocabulary": items,
        "total": total,
        "exported_at": Utc::now().to_rfc3339(),
    })))
}
