//! Video Recommendation Routes
//!
//! `/api/recommend` accepts tags either as a JSON body (POST) or as
//! repeated `tags` query parameters (GET) and answers with the search
//! query, recommended tags, and normalized videos.

use axum::Json;
use axum::extract::{RawQuery, State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::server::AppState;
use crate::types::{LingoError, Result};

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub tags: Vec<String>,
}

/// POST /api/recommend
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<Value>> {
    respond(&state, request.tags).await
}

/// GET /api/recommend?tags=a&tags=b
///
/// Repeated keys do not fit serde's `Query` extractor, so the raw query
/// string is parsed by hand.
pub async fn recommend_query(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>> {
    let tags = query
        .as_deref()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .filter(|(key, _)| key == "tags")
                .map(|(_, value)| value.into_owned())
                .collect()
        })
        .unwrap_or_default();
    respond(&state, tags).await
}

async fn respond(state: &AppState, tags: Vec<String>) -> Result<Json<Value>> {
    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.is_empty() {
        return Err(LingoError::validation("Tags are required"));
    }

    let recommendation = state.video.recommend(&tags).await;
    Ok(Json(json!({
        "success": true,
        "search_query": recommendation.search_query,
        "recommended_tags": recommendation.recommended_tags,
        "videos": recommendation.videos,
    })))
}
