//! Fan-out of one prompt to every configured profile

use super::{
    adapter::Adapter,
    profile::{Profiles, ProviderProfile},
    provider::ProviderRegistry,
    Error, Result,
};
use futures::future::join_all;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Prefix marking a failed entry in the legacy string wire format
pub const ERROR_PREFIX: &str = "Error: ";

/// Result of one provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Answer text returned by the provider
    Answer(String),
    /// Description of why the call failed
    Failure(String),
}

impl Outcome {
    /// Whether the call failed
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// The answer text, if the call succeeded
    pub fn answer(&self) -> Option<&str> {
        match self {
            Outcome::Answer(text) => Some(text),
            Outcome::Failure(_) => None,
        }
    }
}

/// Serializes as a bare string; failures carry the `Error: ` prefix.
impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Outcome::Answer(text) => serializer.serialize_str(text),
            Outcome::Failure(reason) => {
                serializer.serialize_str(&format!("{}{}", ERROR_PREFIX, reason))
            }
        }
    }
}

/// Outcomes keyed by profile id, in snapshot order
pub type QueryResults = IndexMap<String, Outcome>;

/// Serializes query results with an explicit success/failure tag per entry
pub struct TaggedResults<'a>(pub &'a QueryResults);

#[derive(serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum TaggedOutcome<'a> {
    Ok { text: &'a str },
    Error { error: &'a str },
}

impl<'a> From<&'a Outcome> for TaggedOutcome<'a> {
    fn from(outcome: &'a Outcome) -> Self {
        match outcome {
            Outcome::Answer(text) => TaggedOutcome::Ok { text },
            Outcome::Failure(error) => TaggedOutcome::Error { error },
        }
    }
}

impl Serialize for TaggedResults<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, outcome) in self.0 {
            map.serialize_entry(id, &TaggedOutcome::from(outcome))?;
        }
        map.end()
    }
}

/// Sends a prompt to every profile concurrently and collects each outcome
#[derive(Clone)]
pub struct QueryDispatcher {
    registry: ProviderRegistry,
    call_timeout: Option<Duration>,
}

impl QueryDispatcher {
    /// Create a dispatcher with no per-call deadline
    pub fn new(registry: ProviderRegistry) -> Self {
        QueryDispatcher {
            registry,
            call_timeout: None,
        }
    }

    /// Bound every provider call by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Dispatch `prompt` to all `profiles`.
    ///
    /// Fails only on an empty prompt or an empty profile set, before any
    /// provider is contacted. Otherwise every profile gets exactly one entry,
    /// whether its call succeeded or not.
    pub async fn dispatch(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        profiles: &Profiles,
    ) -> Result<QueryResults> {
        if prompt.is_empty() {
            return Err(Error::EmptyPrompt);
        }
        if profiles.is_empty() {
            return Err(Error::NoProfiles);
        }

        let prompt: Arc<str> = Arc::from(prompt);
        let system_prompt: Option<Arc<str>> =
            system_prompt.filter(|s| !s.is_empty()).map(Arc::from);

        // Every call is spawned before any is awaited
        let calls: Vec<_> = profiles
            .iter()
            .map(|(id, profile)| {
                let adapter = self.registry.resolve(&profile.provider);
                let task = tokio::spawn(call_profile(
                    id.clone(),
                    profile.clone(),
                    adapter,
                    prompt.clone(),
                    system_prompt.clone(),
                    self.call_timeout,
                ));
                (id.clone(), task)
            })
            .collect();

        let outcomes = join_all(calls.into_iter().map(|(id, task)| async move {
            let outcome = task.await.unwrap_or_else(|e| {
                error!("Provider call aborted - profile: {}, error: {}", id, e);
                Outcome::Failure(format!("provider call aborted: {}", e))
            });
            (id, outcome)
        }))
        .await;

        Ok(outcomes.into_iter().collect())
    }
}

async fn call_profile(
    id: String,
    profile: ProviderProfile,
    adapter: Result<Arc<dyn Adapter>>,
    prompt: Arc<str>,
    system_prompt: Option<Arc<str>>,
    timeout: Option<Duration>,
) -> Outcome {
    info!(
        "Calling provider - profile: {}, name: {}, provider: {}",
        id, profile.name, profile.provider
    );

    let result = match adapter {
        Ok(adapter) => {
            let call = adapter.invoke(&prompt, system_prompt.as_deref(), &profile);
            match timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .unwrap_or(Err(Error::Timeout(limit))),
                None => call.await,
            }
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(text) => {
            info!("Provider call succeeded - profile: {}, name: {}", id, profile.name);
            Outcome::Answer(text)
        }
        Err(e) => {
            error!(
                "Provider call failed - profile: {}, name: {}, error: {}",
                id, profile.name, e
            );
            Outcome::Failure(e.to_string())
        }
    }
}
