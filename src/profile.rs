//! Provider profile data model

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Error, Result};

/// Default sampling temperature for chat-style adapters
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default completion limit for the OpenAI-style adapter
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Profiles keyed by id, in insertion order
pub type Profiles = IndexMap<String, ProviderProfile>;

/// Provider kind declared by a profile
///
/// Unknown kinds are kept verbatim in [`ProviderKind::Other`] so that a stored
/// profile round-trips unchanged; they are rejected only when a query routes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderKind {
    /// OpenAI API
    OpenAI,
    /// Any endpoint speaking the OpenAI chat-completions protocol
    OpenAICompatible,
    /// Anthropic messages API
    Anthropic,
    /// Google generative language API
    Google,
    /// Anything else
    Other(String),
}

impl ProviderKind {
    /// Get the wire name of this kind
    pub fn as_str(&self) -> &str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::OpenAICompatible => "openai_compatible",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Other(kind) => kind,
        }
    }
}

impl From<String> for ProviderKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "openai" => ProviderKind::OpenAI,
            "openai_compatible" => ProviderKind::OpenAICompatible,
            "anthropic" => ProviderKind::Anthropic,
            "google" => ProviderKind::Google,
            _ => ProviderKind::Other(kind),
        }
    }
}

impl From<ProviderKind> for String {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named configuration for one LLM endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Server-assigned id; ignored on submission
    #[serde(default)]
    pub id: String,

    /// Display name
    pub name: String,

    /// Provider kind
    pub provider: ProviderKind,

    /// API key
    pub api_key: String,

    /// Base URL override (OpenAI-style adapter only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Provider-specific model identifier
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Fields this crate does not interpret, kept as submitted
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProviderProfile {
    /// Create a profile with default call parameters
    pub fn new(
        name: impl Into<String>,
        provider: ProviderKind,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        ProviderProfile {
            id: String::new(),
            name: name.into(),
            provider,
            api_key: api_key.into(),
            api_base: None,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            extra: Map::new(),
        }
    }

    /// Set the base URL override
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Parse a submitted profile body
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidProfile(e.to_string()))
    }

    /// Check that the required fields carry a value
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("api_key", &self.api_key),
            ("model", &self.model),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidProfile(format!("{} is required", field)));
            }
        }
        Ok(())
    }

    /// Base URL override, if set to a non-blank value
    pub fn api_base(&self) -> Option<&str> {
        self.api_base.as_deref().filter(|base| !base.trim().is_empty())
    }

    /// Get the temperature, falling back to 0.7
    pub fn temperature(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Get the max_tokens value, falling back to 1000
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_kind_wire_names() {
        assert_eq!(ProviderKind::from("openai".to_string()), ProviderKind::OpenAI);
        assert_eq!(
            ProviderKind::from("openai_compatible".to_string()),
            ProviderKind::OpenAICompatible
        );
        assert_eq!(ProviderKind::Anthropic.as_str(), "anthropic");
        assert_eq!(ProviderKind::Google.to_string(), "google");
    }

    #[test]
    fn test_unknown_kind_round_trips() {
        let profile = ProviderProfile::from_value(json!({
            "name": "local",
            "provider": "ollama",
            "api_key": "k",
            "model": "llama3"
        }))
        .unwrap();
        assert_eq!(profile.provider, ProviderKind::Other("ollama".to_string()));

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["provider"], "ollama");
    }

    #[test]
    fn test_defaults_and_extra_fields() {
        let profile = ProviderProfile::from_value(json!({
            "name": "gpt",
            "provider": "openai",
            "api_key": "sk-test",
            "model": "gpt-4o",
            "api_base": "",
            "temperature": null,
            "color": "blue"
        }))
        .unwrap();

        assert_eq!(profile.temperature(), 0.7);
        assert_eq!(profile.max_tokens(), 1000);
        assert_eq!(profile.api_base(), None);
        assert_eq!(profile.extra.get("color"), Some(&json!("blue")));

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["color"], "blue");
    }

    #[test]
    fn test_missing_field_is_invalid_profile() {
        let err = ProviderProfile::from_value(json!({"name": "x", "provider": "openai"}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidProfile(_)));
        assert!(err.is_validation());
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let profile = ProviderProfile::new("gpt", ProviderKind::OpenAI, "  ", "gpt-4o");
        let err = profile.validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid profile: api_key is required");

        let profile = ProviderProfile::new("gpt", ProviderKind::OpenAI, "sk", "gpt-4o");
        assert!(profile.validate().is_ok());
    }
}
