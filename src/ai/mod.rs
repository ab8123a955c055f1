//! AI Layer
//!
//! Everything that talks to a remote model lives here:
//!
//! - `provider`: the `ModelProvider`/`ObjectDetector` traits, concrete
//!   providers, and the fallback chain
//! - `signature`: HMAC canonical-request signing for the gateway provider
//! - `prompt`: pure prompt construction
//! - `normalize`: the single boundary turning raw model text into domain types

pub mod normalize;
pub mod prompt;
pub mod provider;
pub mod signature;

pub use provider::{
    ChainConfig, ChatMessage, ChatRole, GenerationOptions, ModelProvider, ObjectDetector,
    ProviderChain, RawModelReply, SharedDetector, SharedProvider,
};
