use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::auth::{RequireAuth, accounts};
use crate::server::AppState;
use crate::server::dto::{LoginRequest, RegisterRequest};
use crate::server::response::{ApiError, ApiResponse};

pub fn account_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = accounts::register(
        state.store.as_ref(),
        &state.auth,
        &req.name,
        &req.email,
        &req.password,
    )?;

    Ok((StatusCode::CREATED, ApiResponse::success(session)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = accounts::login(state.store.as_ref(), &state.auth, &req.email, &req.password)?;

    Ok(ApiResponse::success(session))
}

pub async fn me(auth: RequireAuth) -> impl IntoResponse {
    ApiResponse::success(auth.principal)
}

pub async fn logout(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    accounts::logout(state.store.as_ref(), &auth.token)?;

    Ok(StatusCode::NO_CONTENT)
}
