use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, response::IntoResponse};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::AdminCourseResponse;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::Exercise;

pub async fn list_courses(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let courses = state.store.list_courses()?;

    let mut by_course: HashMap<i64, Vec<Exercise>> = HashMap::new();
    for exercise in state.store.list_exercises()? {
        by_course.entry(exercise.course_id).or_default().push(exercise);
    }

    let response: Vec<AdminCourseResponse> = courses
        .into_iter()
        .map(|course| AdminCourseResponse {
            exercises: by_course.remove(&course.id).unwrap_or_default(),
            course,
        })
        .collect();

    Ok(ApiResponse::success(response))
}
