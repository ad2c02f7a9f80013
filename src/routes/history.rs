use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{auth::AuthUser, error::AppResult, routes::AppState, services::history};

pub async fn list(
    State(state): State<AppState>,
    AuthUser(uid): AuthUser,
) -> AppResult<Json<Value>> {
    let history = history::list_rated_history(state.store.as_ref(), &uid).await?;
    Ok(Json(json!({ "history": history })))
}

pub async fn detail(
    State(state): State<AppState>,
    AuthUser(uid): AuthUser,
    Path(recommendation_id): Path<String>,
) -> AppResult<Json<Value>> {
    let detail = history::get_rated_entry(state.store.as_ref(), &uid, &recommendation_id).await?;
    Ok(Json(json!({
        "recommendation": detail.entry,
        "rating": detail.rating,
    })))
}
