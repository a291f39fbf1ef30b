use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequireAuth;
use crate::enrollment;
use crate::server::AppState;
use crate::server::dto::{CompletionResponse, CourseExercisesResponse, ProgressResponse};
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_courses(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let courses = enrollment::list_courses_for(state.store.as_ref(), &auth.principal)?;
    Ok(ApiResponse::success(courses))
}

/// Course metadata is visible to every signed-in user, locked or not.
pub async fn get_course(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let course = enrollment::load_course(state.store.as_ref(), id)?;
    Ok(ApiResponse::success(course))
}

pub async fn list_exercises(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let (course, exercises) =
        enrollment::course_exercises(state.store.as_ref(), &auth.principal, id)?;
    Ok(ApiResponse::success(CourseExercisesResponse { course, exercises }))
}

pub async fn complete_exercise(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    enrollment::mark_completed(state.store.as_ref(), &auth.principal, id)?;
    Ok(ApiResponse::success(CompletionResponse {
        exercise_id: id,
        completed: true,
    }))
}

pub async fn get_progress(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let completed = enrollment::list_completed(state.store.as_ref(), &auth.principal, course_id)?;
    Ok(ApiResponse::success(ProgressResponse {
        course_id,
        completed_exercise_ids: completed,
    }))
}
