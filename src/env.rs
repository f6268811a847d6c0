//! Bootstrap profiles from provider credentials in the environment
//!
//! Recognised variables:
//! - `OPENAI_API_KEY`, with optional `OPENAI_API_BASE` and `OPENAI_MODEL`
//! - `ANTHROPIC_API_KEY`, with optional `ANTHROPIC_MODEL`
//! - `GOOGLE_API_KEY` (or `GEMINI_API_KEY`), with optional `GOOGLE_MODEL`

use crate::{ConfigStore, ProviderKind, ProviderProfile, Result};

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_GOOGLE_MODEL: &str = "gemini-1.5-flash";

/// Build profiles from the process environment
pub fn profiles_from_env() -> Vec<ProviderProfile> {
    profiles_from_lookup(|key| std::env::var(key).ok())
}

/// Build profiles from `lookup`, one per provider whose key is set
pub fn profiles_from_lookup<F>(lookup: F) -> Vec<ProviderProfile>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    let mut profiles = Vec::new();

    if let Some(api_key) = get("OPENAI_API_KEY") {
        let model = get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let profile = match get("OPENAI_API_BASE") {
            Some(base) => ProviderProfile::new(
                "OpenAI (env)",
                ProviderKind::OpenAICompatible,
                api_key,
                model,
            )
            .with_api_base(base),
            None => ProviderProfile::new("OpenAI (env)", ProviderKind::OpenAI, api_key, model),
        };
        profiles.push(profile);
    }

    if let Some(api_key) = get("ANTHROPIC_API_KEY") {
        let model =
            get("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
        profiles.push(ProviderProfile::new(
            "Anthropic (env)",
            ProviderKind::Anthropic,
            api_key,
            model,
        ));
    }

    if let Some(api_key) = get("GOOGLE_API_KEY").or_else(|| get("GEMINI_API_KEY")) {
        let model = get("GOOGLE_MODEL").unwrap_or_else(|| DEFAULT_GOOGLE_MODEL.to_string());
        profiles.push(ProviderProfile::new(
            "Google (env)",
            ProviderKind::Google,
            api_key,
            model,
        ));
    }

    profiles
}

/// Create `profiles` in `store` if it holds none yet; returns how many were added
pub fn seed_store(store: &ConfigStore, profiles: Vec<ProviderProfile>) -> Result<usize> {
    if !store.is_empty() {
        tracing::debug!("Store already holds profiles, skipping environment seed");
        return Ok(0);
    }
    let mut seeded = 0;
    for profile in profiles {
        store.create(profile)?;
        seeded += 1;
    }
    if seeded > 0 {
        tracing::info!("Seeded {} profile(s) from environment", seeded);
    }
    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_no_keys_no_profiles() {
        assert!(profiles_from_lookup(lookup(&[("OPENAI_API_KEY", " ")])).is_empty());
    }

    #[test]
    fn test_openai_base_makes_compatible_profile() {
        let profiles = profiles_from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_API_BASE", "http://localhost:11434/v1"),
            ("OPENAI_MODEL", "qwen2"),
        ]));
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].provider, ProviderKind::OpenAICompatible);
        assert_eq!(profiles[0].api_base(), Some("http://localhost:11434/v1"));
        assert_eq!(profiles[0].model, "qwen2");
    }

    #[test]
    fn test_all_providers_with_default_models() {
        let profiles = profiles_from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("GEMINI_API_KEY", "goog"),
        ]));
        let kinds: Vec<_> = profiles.iter().map(|p| p.provider.clone()).collect();
        assert_eq!(
            kinds,
            vec![ProviderKind::OpenAI, ProviderKind::Anthropic, ProviderKind::Google]
        );
        assert_eq!(profiles[2].model, DEFAULT_GOOGLE_MODEL);
        assert!(profiles.iter().all(|p| p.validate().is_ok()));
    }

    #[test]
    fn test_seed_store_only_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("profiles.json"));
        let seed = || profiles_from_lookup(lookup(&[("ANTHROPIC_API_KEY", "sk-ant")]));

        assert_eq!(seed_store(&store, seed()).unwrap(), 1);
        assert_eq!(seed_store(&store, seed()).unwrap(), 0);
        assert_eq!(store.len(), 1);
    }
}
