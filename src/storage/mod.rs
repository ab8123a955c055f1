//! Storage Layer
//!
//! Pooled SQLite persistence for the vocabulary book and conversation
//! sessions.

mod database;
mod sessions;
mod vocabulary;

pub use database::{Database, PoolConfig, SharedDatabase};
pub use sessions::{NewSession, SessionRecord, SessionStore};
pub use vocabulary::{
    NewVocabularyItem, VocabularyItem, VocabularyPage, VocabularyStore, VocabularyUpdate,
};
