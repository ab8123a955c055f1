//! Configuration Management
//!
//! Unified configuration with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Config file (lingowizz.toml)
//! 3. Environment variables (LINGOWIZZ_*)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
