//! Route Handlers
//!
//! Grouped the way the original API surface is grouped: image processing,
//! vocabulary book, conversation sessions, and video recommendations.

pub mod images;
pub mod sessions;
pub mod videos;
pub mod vocabulary;
