use axum::{body::Bytes, extract::State, Json};

use crate::{
    auth::AuthUser,
    error::AppResult,
    models::{RecommendationInput, RecommendationRequest},
    routes::{parse_body, AppState},
};

/// Serves the saved pick, generating one on first use
pub async fn current_recommendation(
    State(state): State<AppState>,
    AuthUser(uid): AuthUser,
) -> AppResult<Json<RecommendationInput>> {
    let recommendation = state.recommendations.current_or_generate(&uid).await?;
    Ok(Json(recommendation))
}

/// Generates a fresh pick, optionally steered by `nextPickSteering`
pub async fn new_recommendation(
    State(state): State<AppState>,
    AuthUser(uid): AuthUser,
    body: Bytes,
) -> AppResult<Json<RecommendationInput>> {
    // An empty body simply means no steering
    let request: RecommendationRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RecommendationRequest::default()
    } else {
        parse_body(&body)?
    };
    let steering = request.steering()?;

    let recommendation = state
        .recommendations
        .generate_new(&uid, steering.as_deref())
        .await?;
    Ok(Json(recommendation))
}
