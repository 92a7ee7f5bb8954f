use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    auth::jwt::AuthUser,
    error::Result,
    state::AppState,
    users::{
        dto::{CreateUserInput, ListUsersQuery, ListUsersResponse, MessageResponse, UpdateUserInput},
        repo_types::User,
        services::{list_users, register_user},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(get_users))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateUserInput>, JsonRejection>,
) -> Result<Json<User>> {
    let Json(input) = payload?;
    input.validate()?;

    let user = register_user(&state.users, state.codec, input).await?;
    Ok(Json(user))
}

#[instrument(skip(state, _caller))]
pub async fn get_user(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let user = state.users.get(&id).await?;
    Ok(Json(user))
}

#[instrument(skip(state, caller), fields(caller = %caller.0))]
pub async fn get_users(
    State(state): State<AppState>,
    caller: AuthUser,
    query: std::result::Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<ListUsersResponse>> {
    let Query(q) = query?;
    let res = list_users(&state.users, &q).await?;
    Ok(Json(res))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdateUserInput>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(input) = payload?;
    input.validate()?;

    state
        .users
        .update(
            &id,
            input.firstname().map(String::from),
            input.lastname().map(String::from),
        )
        .await?;

    info!(user_id = %id, "user updated");
    Ok(Json(MessageResponse {
        message: "User has been updated",
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.users.delete(&id).await?;

    info!(user_id = %id, "user deleted");
    Ok(Json(MessageResponse {
        message: "User has been deleted",
    }))
}
