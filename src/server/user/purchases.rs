use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;

use crate::auth::RequireAuth;
use crate::enrollment;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};
use crate::uploads::MAX_ATTACHMENT_SIZE;

struct PurchaseUpload {
    course_id: i64,
    attachment: Option<(Vec<u8>, Option<String>)>,
}

async fn parse_purchase_upload(multipart: &mut Multipart) -> Result<PurchaseUpload, ApiError> {
    let mut course_id: Option<String> = None;
    let mut attachment = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {e}")))?
    {
        match field.name() {
            Some("attachment") => {
                let file_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read attachment: {e}")))?;
                if data.len() > MAX_ATTACHMENT_SIZE {
                    return Err(ApiError::payload_too_large(format!(
                        "Attachment size ({} bytes) exceeds maximum allowed size ({MAX_ATTACHMENT_SIZE} bytes)",
                        data.len()
                    )));
                }
                if !data.is_empty() {
                    attachment = Some((data.to_vec(), file_name));
                }
            }
            Some("course_id" | "courseId") => {
                course_id = Some(field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read course_id: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let course_id: i64 = course_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("course_id is required"))?
        .parse()
        .map_err(|_| ApiError::bad_request("course_id must be an integer"))?;

    Ok(PurchaseUpload {
        course_id,
        attachment,
    })
}

/// POST /purchases - multipart with `course_id` and an optional `attachment`
pub async fn create_purchase(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = parse_purchase_upload(&mut multipart).await?;

    let stored = match &upload.attachment {
        Some((data, file_name)) => Some(state.attachments.put(data, file_name.as_deref()).await?),
        None => None,
    };

    let result = enrollment::submit_purchase(
        state.store.as_ref(),
        &state.outbox,
        &auth.principal,
        upload.course_id,
        stored.clone(),
    );

    match result {
        Ok(purchase) => Ok((StatusCode::CREATED, ApiResponse::success(purchase))),
        Err(e) => {
            if let Some(name) = stored {
                if let Err(remove_err) = state.attachments.remove(&name).await {
                    warn!("Failed to remove orphaned attachment {name}: {remove_err}");
                }
            }
            Err(e.into())
        }
    }
}

pub async fn list_purchases(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let purchases = enrollment::list_user_purchases(state.store.as_ref(), &auth.principal)?;
    Ok(ApiResponse::success(purchases))
}
