use std::sync::Arc;

use axum::{extract::State, response::IntoResponse};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};

/// Newest accounts first. Password hashes are never serialized.
pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.store.list_users()?;
    Ok(ApiResponse::success(users))
}
