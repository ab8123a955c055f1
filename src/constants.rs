//! Crate-wide constants.
//!
//! Grouped by concern; values that are part of a wire contract are noted as
//! such and must not be changed casually.

/// Conversation history handling
pub mod history {
    /// Maximum turns kept per session when loading context
    pub const MAX_TURNS: usize = 10;

    /// Turns included verbatim in the prompt
    pub const PROMPT_TURNS: usize = 5;
}

/// Provider chain behavior
pub mod chain {
    /// Retries per provider before falling over to the next
    pub const MAX_RETRIES_PER_PROVIDER: u8 = 2;

    /// Base delay for exponential backoff
    pub const BASE_DELAY_MS: u64 = 300;

    /// Cap on the backoff delay
    pub const MAX_DELAY_SECS: u64 = 8;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// Upload handling
pub mod upload {
    /// Largest accepted image upload, in bytes (16 MB)
    pub const MAX_IMAGE_BYTES: usize = 16 * 1024 * 1024;

    /// Accepted image file extensions
    pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
}

/// Pagination defaults for list endpoints
pub mod paging {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;
}
