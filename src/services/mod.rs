//! Application Services
//!
//! Orchestration between the AI layer and the domain types. Services are
//! total over provider failures; persistence and HTTP concerns stay in the
//! storage and server layers.

mod conversation;
mod recognition;
mod video;

pub use conversation::ConversationService;
pub use recognition::RecognitionService;
pub use video::{VideoInfo, VideoRecommendation, VideoSearchService};
