use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use crate::auth::RequireAdmin;
use crate::enrollment;
use crate::server::AppState;
use crate::server::dto::PurchaseListParams;
use crate::server::response::{ApiError, ApiResponse};
use crate::uploads::content_type;

pub async fn list_purchases(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PurchaseListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let status = params.status().map_err(ApiError::bad_request)?;
    let purchases = enrollment::list_purchases(state.store.as_ref(), status)?;
    Ok(ApiResponse::success(purchases))
}

pub async fn approve_purchase(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let purchase = enrollment::approve_purchase(state.store.as_ref(), &state.outbox, id)?;
    tracing::info!("Purchase {id} approved by {}", admin.email);
    Ok(ApiResponse::success(purchase))
}

pub async fn reject_purchase(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let purchase = enrollment::reject_purchase(state.store.as_ref(), id)?;
    tracing::info!("Purchase {id} rejected by {}", admin.email);
    Ok(ApiResponse::success(purchase))
}

/// GET /admin/purchases/{id}/attachment - stream the payment proof
pub async fn download_attachment(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let name = enrollment::purchase_attachment(state.store.as_ref(), id)?;
    let (reader, size) = state.attachments.open(&name).await?;

    let body = Body::from_stream(ReaderStream::new(reader));

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(&name))
        .header(header::CONTENT_LENGTH, size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        )
        .header("X-Content-Type-Options", "nosniff")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}
