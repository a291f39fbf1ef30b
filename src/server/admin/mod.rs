mod courses;
mod purchases;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Purchase review
        .route("/purchases", get(purchases::list_purchases))
        .route("/purchases/{id}/approve", post(purchases::approve_purchase))
        .route("/purchases/{id}/reject", post(purchases::reject_purchase))
        .route(
            "/purchases/{id}/attachment",
            get(purchases::download_attachment),
        )
        // Directory
        .route("/users", get(users::list_users))
        .route("/courses", get(courses::list_courses))
}
