use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::FromRef,
    http::StatusCode,
    middleware,
    routing::{delete, get},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth::IdentityVerifier,
    db::Store,
    error::{AppError, AppResult},
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::RecommendationService,
};

pub mod account;
pub mod agent;
pub mod goals;
pub mod history;
pub mod ratings;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub recommendations: Arc<RecommendationService>,
}

impl FromRef<AppState> for Arc<dyn IdentityVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.identity.clone()
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                // Clients authenticate with bearer tokens, never cookies
                .layer(CorsLayer::permissive()),
        )
}

/// Authenticated routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/agent/recommendation",
            get(agent::current_recommendation).post(agent::new_recommendation),
        )
        .route("/ratings", get(ratings::list).post(ratings::upsert))
        .route("/recommendations/history", get(history::list))
        .route("/recommendations/history/:id", get(history::detail))
        .route("/user/goals", get(goals::get).post(goals::upsert))
        .route("/user/goals/options", get(goals::options))
        .route("/user/delete", delete(account::delete))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Parses a JSON body, answering 400 `Invalid request body` for anything
/// that is not a JSON object of the expected shape
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    let invalid = || AppError::InvalidInput("Invalid request body".to_string());

    match serde_json::from_slice::<Value>(body).map_err(|_| invalid())? {
        object @ Value::Object(_) => serde_json::from_value(object).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}
