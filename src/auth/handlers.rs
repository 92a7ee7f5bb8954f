use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tower_sessions::Session;
use tracing::{debug, instrument};
use validator::Validate;

use crate::{
    auth::{dto::LoginInput, dto::TokenResponse, services::SessionIssuer},
    error::Result,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    payload: std::result::Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<TokenResponse>> {
    let Json(input) = payload?;
    input.validate()?;

    let issuer = SessionIssuer::from_ref(&state);
    let outcome = issuer.login(&input.email, &input.password, &session).await?;
    debug!(user_id = %outcome.user_id, session_id = %outcome.session_id, "session issued");

    Ok(Json(TokenResponse {
        token: outcome.token,
    }))
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    SessionIssuer::from_ref(&state).logout(&session).await?;
    Ok(StatusCode::OK)
}
