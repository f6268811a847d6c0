//! Multi-provider LLM fan-out gateway
//!
//! Stores named provider profiles and sends one prompt to all of them at
//! once, collecting each provider's answer or failure independently.
mod adapter;
mod dispatch;
pub mod env;
pub mod gate;
mod message;
#[cfg(test)]
mod mock_server;
mod profile;
mod provider;
mod store;

use std::time::Duration;
use thiserror::Error;

/// Result type for emx-fanout operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for emx-fanout operations
#[derive(Debug, Error)]
pub enum Error {
    /// Query submitted with an empty prompt
    #[error("prompt must not be empty")]
    EmptyPrompt,

    /// Query submitted while no profile is configured
    #[error("no provider profiles configured")]
    NoProfiles,

    /// Profile is missing a required field
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    /// Request body could not be read as the expected JSON
    #[error("invalid request body: {0}")]
    InvalidRequest(String),

    /// No profile with this id
    #[error("profile not found: {0}")]
    NotFound(String),

    /// Provider kind has no adapter
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// API error
    #[error("API error: {0}")]
    Api(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider call exceeded the per-call deadline
    #[error("provider call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Profile store could not be read or written
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl Error {
    /// Whether the error was caused by the caller's input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyPrompt
                | Error::NoProfiles
                | Error::InvalidProfile(_)
                | Error::InvalidRequest(_)
        )
    }
}

pub use adapter::{Adapter, AnthropicAdapter, GoogleAdapter, OpenAIAdapter};
pub use dispatch::{Outcome, QueryDispatcher, QueryResults, TaggedResults};
pub use message::{Message, MessageRole};
pub use profile::{ProviderKind, ProviderProfile, Profiles};
pub use provider::{ProviderEndpoints, ProviderRegistry};
pub use store::ConfigStore;

/// Re-exported so downstream adapters can implement [`Adapter`]
pub use async_trait::async_trait;
