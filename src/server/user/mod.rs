mod courses;
mod purchases;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::server::AppState;
use crate::uploads::MAX_ATTACHMENT_SIZE;

/// Room for the multipart framing and the text fields around the proof file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Catalog
        .route("/courses", get(courses::list_courses))
        .route("/courses/{id}", get(courses::get_course))
        .route("/courses/{id}/exercises", get(courses::list_exercises))
        // Progress
        .route("/exercises/{id}/complete", post(courses::complete_exercise))
        .route("/progress/{course_id}", get(courses::get_progress))
        // Purchases
        .route(
            "/purchases",
            post(purchases::create_purchase)
                .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_SIZE + MULTIPART_OVERHEAD)),
        )
        .route("/purchases", get(purchases::list_purchases))
}
