use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use gendra_core::client_cache::InvalidateScope;
use gendra_core::domain::client::{ClientConfig, ClientId};
use gendra_core::domain::quote::QuoteRecord;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::service::{
    ClientConfigPayload, LeadRequest, LeadResponse, ParsedUpload, QuoteRequest, QuoteResponse,
    QuoteService,
};

pub const CLIENT_ID_HEADER: &str = "x-client-id";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QuoteService>,
    pub admin_token: Option<SecretString>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SchemaListing {
    pub schemas: Vec<String>,
    pub fallback: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvalidationResponse {
    pub invalidated: String,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuoteHistory {
    pub client_id: String,
    pub quotes: Vec<QuoteRecord>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/schemas", get(list_schemas))
        .route("/api/v1/quote", post(create_quote))
        .route("/api/v1/leads", post(create_lead))
        .route("/api/v1/parse", post(parse_upload))
        .route("/api/v1/clients/cache", delete(invalidate_all))
        .route(
            "/api/v1/clients/{client_id}/config",
            get(get_client_config).put(put_client_config),
        )
        .route("/api/v1/clients/{client_id}/cache", delete(invalidate_client))
        .route("/api/v1/clients/{client_id}/quotes", get(list_client_quotes))
        .with_state(state)
}

fn client_id_from(headers: &HeaderMap) -> Option<ClientId> {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| ClientId(value.to_string()))
}

/// Admin routes are open when no token is configured.
fn authorize_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = &state.admin_token else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    match presented {
        Some(token) if constant_time_eq(token.as_bytes(), expected.expose_secret().as_bytes()) => {
            Ok(())
        }
        _ => {
            warn!(
                event_name = "api.admin.unauthorized",
                correlation_id = "unassigned",
                "admin request rejected"
            );
            Err(ApiError::Unauthorized)
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

pub async fn list_schemas(State(state): State<AppState>) -> Json<SchemaListing> {
    let registry = state.service.orchestrator().registry();
    Json(SchemaListing {
        schemas: registry.keys().into_iter().map(str::to_string).collect(),
        fallback: registry.fallback().name(),
    })
}

pub async fn create_quote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let response = state.service.quote(request, client_id_from(&headers)).await?;
    Ok(Json(response))
}

pub async fn create_lead(
    State(state): State<AppState>,
    Json(request): Json<LeadRequest>,
) -> Result<(StatusCode, Json<LeadResponse>), ApiError> {
    let response = state.service.capture_lead(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn parse_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ParsedUpload>, ApiError> {
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|value| value.to_str().ok());
    let parsed = state.service.parse_upload(content_type, &body)?;
    Ok(Json(parsed))
}

pub async fn get_client_config(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<ClientConfig>, ApiError> {
    let config = state.service.client_config(&ClientId(client_id)).await?;
    Ok(Json(config.as_ref().clone()))
}

pub async fn put_client_config(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<ClientConfigPayload>,
) -> Result<Json<ClientConfig>, ApiError> {
    authorize_admin(&state, &headers)?;
    let config = state.service.upsert_client_config(ClientId(client_id), payload).await?;
    Ok(Json(config))
}

pub async fn list_client_quotes(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Query(query): Query<HistoryQuery>,
    headers: HeaderMap,
) -> Result<Json<QuoteHistory>, ApiError> {
    authorize_admin(&state, &headers)?;
    let client_id = ClientId(client_id);
    let quotes = state.service.recent_quotes(&client_id, query.limit).await?;
    Ok(Json(QuoteHistory { client_id: client_id.0, quotes }))
}

pub async fn invalidate_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<InvalidationResponse>, ApiError> {
    authorize_admin(&state, &headers)?;
    let client_id = ClientId(client_id);
    state.service.invalidate(InvalidateScope::Key(&client_id)).await;
    info!(
        event_name = "client_config.cache.invalidated",
        correlation_id = %client_id,
        client_id = %client_id,
        "client config cache entry dropped"
    );
    Ok(Json(InvalidationResponse { invalidated: client_id.0 }))
}

pub async fn invalidate_all(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<InvalidationResponse>, ApiError> {
    authorize_admin(&state, &headers)?;
    state.service.invalidate(InvalidateScope::All).await;
    info!(
        event_name = "client_config.cache.cleared",
        correlation_id = "admin",
        "client config cache cleared"
    );
    Ok(Json(InvalidationResponse { invalidated: "all".to_string() }))
}
