//! HTTP request handlers for the gateway

use crate::gate::config::GatewayConfig;
use crate::{
    env, ConfigStore, Error, Profiles, ProviderProfile, ProviderRegistry, QueryDispatcher,
    QueryResults, Result, TaggedResults,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Gateway state shared across handlers
#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<ConfigStore>,
    pub dispatcher: Arc<QueryDispatcher>,
}

impl GatewayState {
    pub fn new(store: ConfigStore, dispatcher: QueryDispatcher) -> Self {
        GatewayState {
            store: Arc::new(store),
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Open the store, seed it if requested, and build the HTTP adapters
    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        if let Some(parent) = config.store_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = ConfigStore::open(&config.store_path);
        if config.seed_from_env {
            env::seed_store(&store, env::profiles_from_env())?;
        }

        let registry = ProviderRegistry::new(&config.endpoints, config.timeout())?;
        let dispatcher = QueryDispatcher::new(registry).with_timeout(config.timeout());
        Ok(GatewayState::new(store, dispatcher))
    }
}

/// Body of a query request
///
/// A missing or null prompt reads as empty.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// Turn an extractor rejection into a validation error
fn request_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| Error::InvalidRequest(rejection.body_text()))
}

type ErrorResponse = (StatusCode, Json<Value>);

fn status_for(err: &Error) -> StatusCode {
    match err {
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn config_error(operation: &str, err: Error) -> ErrorResponse {
    error!("Failed to {}: {}", operation, err);
    (
        status_for(&err),
        Json(json!({
            "status": "error",
            "message": format!("Failed to {}: {}", operation, err)
        })),
    )
}

fn query_error(err: Error) -> ErrorResponse {
    error!("Query rejected: {}", err);
    (status_for(&err), Json(json!({"error": err.to_string()})))
}

/// Run a store operation off the async workers.
///
/// Writers hold the store lock across a synchronous file write, so reads go
/// through here too.
async fn with_store<T, F>(store: &Arc<ConfigStore>, op: F) -> Result<T>
where
    F: FnOnce(&ConfigStore) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| Error::Persistence(format!("store task failed: {}", e)))?
}

/// Handle `POST /api/config`
pub async fn create_config(
    State(state): State<GatewayState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> std::result::Result<Json<Value>, ErrorResponse> {
    let profile = request_body(body)
        .and_then(ProviderProfile::from_value)
        .map_err(|e| config_error("save config", e))?;
    let id = with_store(&state.store, move |store| store.create(profile))
        .await
        .map_err(|e| config_error("save config", e))?;
    Ok(Json(json!({"status": "success", "id": id})))
}

/// Handle `PUT /api/config/{id}`
pub async fn update_config(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> std::result::Result<Json<Value>, ErrorResponse> {
    // An unknown id is reported before the body is looked at
    let lookup = id.clone();
    let known = with_store(&state.store, move |store| Ok(store.get(&lookup).is_some()))
        .await
        .map_err(|e| config_error("update config", e))?;
    if !known {
        return Err(config_error("update config", Error::NotFound(id)));
    }
    let profile = request_body(body)
        .and_then(ProviderProfile::from_value)
        .map_err(|e| config_error("update config", e))?;
    with_store(&state.store, move |store| store.update(&id, profile))
        .await
        .map_err(|e| config_error("update config", e))?;
    Ok(Json(json!({"status": "success"})))
}

/// Handle `DELETE /api/config/{id}`
pub async fn delete_config(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> std::result::Result<Json<Value>, ErrorResponse> {
    with_store(&state.store, move |store| store.delete(&id))
        .await
        .map_err(|e| config_error("delete config", e))?;
    Ok(Json(json!({"status": "success"})))
}

/// Handle `GET /api/config`
pub async fn list_configs(
    State(state): State<GatewayState>,
) -> std::result::Result<Json<Profiles>, ErrorResponse> {
    with_store(&state.store, |store| Ok(store.list_all()))
        .await
        .map(Json)
        .map_err(|e| config_error("load configs", e))
}

async fn run_query(
    state: &GatewayState,
    body: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> std::result::Result<QueryResults, ErrorResponse> {
    let request = request_body(body).map_err(query_error)?;
    let snapshot = with_store(&state.store, |store| Ok(store.list_all()))
        .await
        .map_err(query_error)?;
    info!("Query request - {} profile(s)", snapshot.len());
    state
        .dispatcher
        .dispatch(
            request.prompt.as_deref().unwrap_or_default(),
            request.system_prompt.as_deref(),
            &snapshot,
        )
        .await
        .map_err(query_error)
}

/// Handle `POST /api/query`: entries are answer strings or `Error: ...` strings
pub async fn query(
    State(state): State<GatewayState>,
    body: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> std::result::Result<Json<QueryResults>, ErrorResponse> {
    run_query(&state, body).await.map(Json)
}

/// Handle `POST /api/v2/query`: entries carry an explicit `status` tag
pub async fn query_tagged(
    State(state): State<GatewayState>,
    body: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    match run_query(&state, body).await {
        Ok(results) => Json(TaggedResults(&results)).into_response(),
        Err(rejection) => rejection.into_response(),
    }
}
