//! Conversation Session Routes
//!
//! Session lifecycle and the tutoring message exchange. Sending a message
//! loads the recent transcript into an explicit [`ConversationContext`]
//! before generating the reply, so reply generation itself stays stateless.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::constants::history;
use crate::server::AppState;
use crate::storage::NewSession;
use crate::types::{ConversationContext, ConversationTurn, LingoError, Result, Sender};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub theme: ThemeData,
    #[serde(default)]
    pub image_path: Option<String>,
}

/// Theme payload as produced by the theme-generation endpoint.
#[derive(Debug, Deserialize)]
pub struct ThemeData {
    pub title: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// POST /api/sessions
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let session = state.sessions.create(&NewSession {
        theme: request.theme.title,
        role: request.theme.role.unwrap_or_else(|| "Assistant".to_string()),
        background: request.theme.background.unwrap_or_default(),
        image_path: request.image_path,
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "session": session})),
    ))
}

/// GET /api/sessions
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>> {
    let sessions = state.sessions.list()?;
    Ok(Json(json!({"success": true, "sessions": sessions})))
}

/// DELETE /api/sessions/{session_id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>> {
    state.sessions.delete(&session_id)?;
    Ok(Json(json!({
        "success": true,
        "message": "Session deleted successfully",
    })))
}

/// GET /api/sessions/{session_id}/messages
pub async fn get_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>> {
    let messages: Vec<Value> = state
        .sessions
        .messages(&session_id)?
        .iter()
        .map(turn_to_json)
        .collect();
    Ok(Json(json!({"success": true, "messages": messages})))
}

/// POST /api/sessions/{session_id}/messages
///
/// Persists the user's message, generates the in-character reply from the
/// recent transcript, persists that too, and returns both turns.
pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<Value>> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(LingoError::validation("Message is required"));
    }

    let session = state.sessions.get(&session_id)?;

    // History is loaded before the new message is stored; the prompt
    // builder appends the new message itself.
    let context = ConversationContext {
        session_id: session.session_id.clone(),
        role: session.role.clone(),
        theme: session.theme.clone(),
        background: session.background.clone(),
        history: state
            .sessions
            .recent_turns(&session_id, history::MAX_TURNS)?,
    };

    let user_turn = state
        .sessions
        .append_message(&session_id, Sender::User, message)?;

    let reply = state.conversation.generate_reply(&context, message).await;
    let ai_turn = state
        .sessions
        .append_message(&session_id, Sender::Assistant, &reply)?;

    Ok(Json(json!({
        "success": true,
        "user_message": turn_to_json(&user_turn),
        "ai_message": turn_to_json(&ai_turn),
    })))
}

fn turn_to_json(turn: &ConversationTurn) -> Value {
    json!({
        "session_id": turn.session_id,
        "sender": turn.sender.as_str(),
        "message": turn.message,
        "timestamp": turn.timestamp.to_rfc3339(),
        "is_user": turn.sender == Sender::User,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_turn_json_marks_user_turns() {
        let turn = ConversationTurn {
            session_id: "s1".to_string(),
            sender: Sender::User,
            message: "hi".to_string(),
            timestamp: Utc::now(),
        };
        let value = turn_to_json(&turn);
        assert_eq!(value["is_user"], true);
        assert_eq!(value["sender"], "user");
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateSessionRequest = serde_json::from_str(
            r#"{"theme": {"title": "Kitchen Cooking Assistant"}}"#,
        )
        .unwrap();
        assert!(request.theme.role.is_none());
        assert!(request.image_path.is_none());
    }
}
