use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{auth::AuthUser, error::AppResult, routes::AppState, services::account};

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(uid): AuthUser,
) -> AppResult<Json<Value>> {
    account::delete_account(state.store.as_ref(), state.identity.as_ref(), &uid).await?;
    Ok(Json(json!({ "success": true })))
}
