//! LingoWizz backend
//!
//! Photo-based vocabulary learning: upload a photo, let the AI layer
//! describe it and find its objects, save words to the vocabulary book,
//! and practice them in role-play tutoring conversations.

pub mod ai;
pub mod config;
pub mod constants;
pub mod server;
pub mod services;
pub mod storage;
pub mod types;

pub use types::{LingoError, Result};
