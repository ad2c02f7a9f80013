use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    auth::AuthUser,
    error::AppResult,
    models::{goal_options, GoalsPayload},
    routes::{parse_body, AppState},
};

pub async fn get(
    State(state): State<AppState>,
    AuthUser(uid): AuthUser,
) -> AppResult<Json<Value>> {
    let goals = state.store.get_goals(&uid).await?;
    Ok(Json(json!({ "goals": goals })))
}

pub async fn upsert(
    State(state): State<AppState>,
    AuthUser(uid): AuthUser,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Value>)> {
    let input = parse_body::<GoalsPayload>(&body)?.validate()?;
    let goals = state.store.upsert_goals(&uid, &input).await?;
    tracing::info!(uid = %uid, goals = goals.selected_goals.len(), "Goals persisted");

    Ok((StatusCode::CREATED, Json(json!({ "goals": goals }))))
}

/// The fixed goal catalogue, for onboarding screens
pub async fn options(AuthUser(_uid): AuthUser) -> Json<Value> {
    Json(json!({ "options": goal_options() }))
}
