//! Authentication handlers

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::auth::{LoginInput, TokenResponse};
use crate::services::AuthService;
use crate::AppState;

/// Admin login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<TokenResponse>> {
    let service = AuthService::new(
        state.db.clone(),
        state.config.jwt.secret.clone(),
        state.config.jwt.access_token_expiry,
    );
    let token = service.login(input).await?;
    Ok(Json(token))
}
