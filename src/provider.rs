//! Provider resolution

use super::{
    adapter::{build_http_client, Adapter, AnthropicAdapter, GoogleAdapter, OpenAIAdapter},
    profile::ProviderKind,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default base URLs for each provider family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
    /// Used when an OpenAI-style profile sets no `api_base`
    #[serde(default = "default_openai_base")]
    pub openai: String,

    #[serde(default = "default_anthropic_base")]
    pub anthropic: String,

    #[serde(default = "default_google_base")]
    pub google: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openai: default_openai_base(),
            anthropic: default_anthropic_base(),
            google: default_google_base(),
        }
    }
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_google_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

/// Maps each provider kind to its adapter
///
/// `openai` and `openai_compatible` share one adapter; every kind outside the
/// known set fails with [`Error::UnsupportedProvider`].
#[derive(Clone)]
pub struct ProviderRegistry {
    openai: Arc<dyn Adapter>,
    anthropic: Arc<dyn Adapter>,
    google: Arc<dyn Adapter>,
}

impl ProviderRegistry {
    /// Create the HTTP adapters, sharing one connection pool
    pub fn new(endpoints: &ProviderEndpoints, timeout: Duration) -> Result<Self> {
        let http_client = build_http_client(timeout)?;
        Ok(ProviderRegistry {
            openai: Arc::new(OpenAIAdapter::new(http_client.clone(), endpoints.openai.clone())),
            anthropic: Arc::new(AnthropicAdapter::new(
                http_client.clone(),
                endpoints.anthropic.clone(),
            )),
            google: Arc::new(GoogleAdapter::new(http_client, endpoints.google.clone())),
        })
    }

    /// Create a registry that routes every known kind to `adapter`
    pub fn uniform(adapter: Arc<dyn Adapter>) -> Self {
        ProviderRegistry {
            openai: adapter.clone(),
            anthropic: adapter.clone(),
            google: adapter,
        }
    }

    /// Replace the adapter used for `openai` and `openai_compatible`
    pub fn with_openai(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.openai = adapter;
        self
    }

    /// Replace the adapter used for `anthropic`
    pub fn with_anthropic(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.anthropic = adapter;
        self
    }

    /// Replace the adapter used for `google`
    pub fn with_google(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.google = adapter;
        self
    }

    /// Resolve the adapter for `kind`
    pub fn resolve(&self, kind: &ProviderKind) -> Result<Arc<dyn Adapter>> {
        match kind {
            ProviderKind::OpenAI | ProviderKind::OpenAICompatible => Ok(self.openai.clone()),
            ProviderKind::Anthropic => Ok(self.anthropic.clone()),
            ProviderKind::Google => Ok(self.google.clone()),
            ProviderKind::Other(kind) => Err(Error::UnsupportedProvider(kind.clone())),
        }
    }
}
