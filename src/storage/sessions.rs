//! Conversation Session Storage
//!
//! Sessions and their message transcripts. Deleting a session cascades to
//! its messages via the foreign key. Transcripts are appended only; the
//! recent-turns query is what feeds the reply generator's context.

use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::database::SharedDatabase;
use crate::types::{ConversationTurn, LingoError, Result, Sender};

/// One tutoring session and its role-play setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub theme: String,
    pub role: String,
    pub background: String,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when starting a session.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSession {
    pub theme: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub image_path: Option<String>,
}

fn default_role() -> String {
    "Assistant".to_string()
}

pub struct SessionStore {
    db: SharedDatabase,
}

impl SessionStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Start a session with a fresh id.
    pub fn create(&self, new: &NewSession) -> Result<SessionRecord> {
        if new.theme.trim().is_empty() {
            return Err(LingoError::validation("theme must not be empty"));
        }

        let record = SessionRecord {
            session_id: Uuid::new_v4().to_string(),
            theme: new.theme.clone(),
            role: new.role.clone(),
            background: new.background.clone(),
            image_path: new.image_path.clone(),
            created_at: Utc::now(),
        };

        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO conversation_sessions \
             (session_id, theme, role, background, image_path, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.session_id,
                record.theme,
                record.role,
                record.background,
                record.image_path,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(record)
    }

    pub fn get(&self, session_id: &str) -> Result<SessionRecord> {
        let conn = self.db.conn()?;
        conn.query_row(
            "SELECT session_id, theme, role, background, image_path, created_at \
             FROM conversation_sessions WHERE session_id = ?1",
            params![session_id],
            row_to_session,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                LingoError::not_found(format!("session {session_id}"))
            }
            other => other.into(),
        })
    }

    /// All sessions, newest first.
    pub fn list(&self) -> Result<Vec<SessionRecord>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT session_id, theme, role, background, image_path, created_at \
             FROM conversation_sessions ORDER BY created_at DESC",
        )?;
        let sessions = stmt
            .query_map([], row_to_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// Delete a session; its messages go with it.
    pub fn delete(&self, session_id: &str) -> Result<()> {
        let conn = self.db.conn()?;
        let affected = conn.execute(
            "DELETE FROM conversation_sessions WHERE session_id = ?1",
            params![session_id],
        )?;
        if affected == 0 {
            return Err(LingoError::not_found(format!("session {session_id}")));
        }
        Ok(())
    }

    /// Append one turn to the transcript.
    pub fn append_message(
        &self,
        session_id: &str,
        sender: Sender,
        message: &str,
    ) -> Result<ConversationTurn> {
        // FK enforcement would catch this too, but a NotFound reads better
        // than a constraint violation at the route layer.
        self.get(session_id)?;

        let turn = ConversationTurn {
            session_id: session_id.to_string(),
            sender,
            message: message.to_string(),
            timestamp: Utc::now(),
        };

        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO conversation_messages (session_id, sender, message, timestamp) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                turn.session_id,
                turn.sender.as_str(),
                turn.message,
                turn.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(turn)
    }

    /// Full transcript, oldest first.
    pub fn messages(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        self.get(session_id)?;
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT session_id, sender, message, timestamp FROM conversation_messages \
             WHERE session_id = ?1 ORDER BY id ASC",
        )?;
        let turns = stmt
            .query_map(params![session_id], row_to_turn)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(turns)
    }

    /// The last `limit` turns, oldest first, ready for prompt building.
    pub fn recent_turns(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT session_id, sender, message, timestamp FROM ( \
                 SELECT id, session_id, sender, message, timestamp \
                 FROM conversation_messages WHERE session_id = ?1 \
                 ORDER BY id DESC LIMIT ?2 \
             ) ORDER BY id ASC",
        )?;
        let turns = stmt
            .query_map(params![session_id, limit as i64], row_to_turn)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(turns)
    }
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        session_id: row.get(0)?,
        theme: row.get(1)?,
        role: row.get(2)?,
        background: row.get(3)?,
        image_path: row.get(4)?,
        created_at: parse_timestamp(row, 5)?,
    })
}

fn row_to_turn(row: &Row<'_>) -> rusqlite::Result<ConversationTurn> {
    let sender_raw: String = row.get(1)?;
    let sender = Sender::parse(&sender_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown sender '{sender_raw}'").into(),
        )
    })?;
    Ok(ConversationTurn {
        session_id: row.get(0)?,
        sender,
        message: row.get(2)?,
        timestamp: parse_timestamp(row, 3)?,
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}
