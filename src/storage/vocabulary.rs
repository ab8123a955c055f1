//! Vocabulary Book Storage
//!
//! CRUD, search, and export over the `vocabulary_items` table. Words are
//! unique; inserting a duplicate is a domain error rather than a constraint
//! violation leaking out of SQLite.

use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use serde::{Deserialize, Serialize};

use super::database::SharedDatabase;
use crate::constants::paging;
use crate::types::{LingoError, Result};

/// One saved word with its learning context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub id: i64,
    pub word: String,
    pub definition: String,
    pub example_sentence: Option<String>,
    pub image_path: Option<String>,
    pub segmented_image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when adding a word.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVocabularyItem {
    pub word: String,
    pub definition: String,
    #[serde(default)]
    pub example_sentence: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub segmented_image_path: Option<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VocabularyUpdate {
    pub word: Option<String>,
    pub definition: Option<String>,
    pub example_sentence: Option<String>,
    pub image_path: Option<String>,
    pub segmented_image_path: Option<String>,
}

/// One page of vocabulary plus totals for the pager UI.
#[derive(Debug, Serialize)]
pub struct VocabularyPage {
    pub items: Vec<VocabularyItem>,
    pub total: u32,
    pub pages: u32,
    pub current_page: u32,
}

pub struct VocabularyStore {
    db: SharedDatabase,
}

impl VocabularyStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Page through the book, newest first.
    pub fn list(&self, page: u32, per_page: u32) -> Result<VocabularyPage> {
        let page = page.max(paging::DEFAULT_PAGE);
        let per_page = per_page.clamp(1, paging::MAX_PER_PAGE);

        let conn = self.db.conn()?;
        let total: u32 =
            conn.query_row("SELECT COUNT(*) FROM vocabulary_items", [], |row| row.get(0))?;
        let pages = total.div_ceil(per_page);

        let mut stmt = conn.prepare(
            "SELECT id, word, definition, example_sentence, image_path, segmented_image_path, \
             created_at, updated_at FROM vocabulary_items \
             ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        )?;
        let items = stmt
            .query_map(params![per_page, (page - 1) * per_page], row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(VocabularyPage {
            items,
            total,
            pages,
            current_page: page,
        })
    }

    /// Add a word; duplicate words are rejected.
    pub fn insert(&self, new: &NewVocabularyItem) -> Result<VocabularyItem> {
        let word = new.word.trim();
        if word.is_empty() {
            return Err(LingoError::validation("word must not be empty"));
        }
        if new.definition.trim().is_empty() {
            return Err(LingoError::validation("definition must not be empty"));
        }

        let conn = self.db.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM vocabulary_items WHERE word = ?1)",
            params![word],
            |row| row.get(0),
        )?;
        if exists {
            return Err(LingoError::DuplicateWord(word.to_string()));
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO vocabulary_items \
             (word, definition, example_sentence, image_path, segmented_image_path, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                word,
                new.definition,
                new.example_sentence,
                new.image_path,
                new.segmented_image_path,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| map_word_conflict(e, word))?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get(id)
    }

    pub fn get(&self, id: i64) -> Result<VocabularyItem> {
        let conn = self.db.conn()?;
        conn.query_row(
            "SELECT id, word, definition, example_sentence, image_path, segmented_image_path, \
             created_at, updated_at FROM vocabulary_items WHERE id = ?1",
            params![id],
            row_to_item,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                LingoError::not_found(format!("vocabulary item {id}"))
            }
            other => other.into(),
        })
    }

    /// Apply a partial update and bump `updated_at`.
    pub fn update(&self, id: i64, update: &VocabularyUpdate) -> Result<VocabularyItem> {
        let mut item = self.get(id)?;

        if let Some(word) = &update.word {
            item.word = word.trim().to_string();
        }
        if let Some(definition) = &update.definition {
            item.definition = definition.clone();
        }
        if let Some(example) = &update.example_sentence {
            item.example_sentence = Some(example.clone());
        }
        if let Some(path) = &update.image_path {
            item.image_path = Some(path.clone());
        }
        if let Some(path) = &update.segmented_image_path {
            item.segmented_image_path = Some(path.clone());
        }
        item.updated_at = Utc::now();

        let conn = self.db.conn()?;
        conn.execute(
            "UPDATE vocabulary_items SET word = ?1, definition = ?2, example_sentence = ?3, \
             image_path = ?4, segmented_image_path = ?5, updated_at = ?6 WHERE id = ?7",
            params![
                item.word,
                item.definition,
                item.example_sentence,
                item.image_path,
                item.segmented_image_path,
                item.updated_at.to_rfc3339(),
                id,
            ],
        )
        .map_err(|e| map_word_conflict(e, &item.word))?;
        Ok(item)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.conn()?;
        let affected = conn.execute("DELETE FROM vocabulary_items WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(LingoError::not_found(format!("vocabulary item {id}")));
        }
        Ok(())
    }

    /// Substring search over word and definition.
    pub fn search(&self, query: &str) -> Result<Vec<VocabularyItem>> {
        let pattern = format!("%{}%", escape_like(query));
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, word, definition, example_sentence, image_path, segmented_image_path, \
             created_at, updated_at FROM vocabulary_items \
             WHERE word LIKE ?1 ESCAPE '\\' OR definition LIKE ?1 ESCAPE '\\' \
             ORDER BY created_at DESC, id DESC",
        )?;
        let items = stmt
            .query_map(params![pattern], row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Full dump for export, oldest first.
    pub fn export(&self) -> Result<Vec<VocabularyItem>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, word, definition, example_sentence, image_path, segmented_image_path, \
             created_at, updated_at FROM vocabulary_items ORDER BY created_at ASC, id ASC",
        )?;
        let items = stmt
            .query_map([], row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<VocabularyItem> {
    Ok(VocabularyItem {
        id: row.get(0)?,
        word: row.get(1)?,
        definition: row.get(2)?,
        example_sentence: row.get(3)?,
        image_path: row.get(4)?,
        segmented_image_path: row.get(5)?,
        created_at: parse_timestamp(row, 6)?,
        updated_at: parse_timestamp(row, 7)?,
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

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// UNIQUE violations on `word` surface as the domain duplicate error. The
/// pre-insert existence check covers the common path; this backstop covers
/// concurrent inserts and renames onto an existing word.
fn map_word_conflict(e: rusqlite::Error, word: &str) -> LingoError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e
        && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    {
        return LingoError::DuplicateWord(word.to_string());
    }
    e.into()
}
