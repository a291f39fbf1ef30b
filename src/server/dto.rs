use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{Course, Exercise, ExerciseWithProgress, PurchaseStatus};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CourseExercisesResponse {
    pub course: Course,
    pub exercises: Vec<ExerciseWithProgress>,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub course_id: i64,
    pub completed_exercise_ids: BTreeSet<i64>,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub exercise_id: i64,
    pub completed: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseListParams {
    #[serde(default)]
    pub status: Option<String>,
}

impl PurchaseListParams {
    /// Parses `status` case-insensitively. Absent means `PENDING`.
    pub fn status(&self) -> Result<Option<PurchaseStatus>, String> {
        self.status.as_deref().map(str::parse::<PurchaseStatus>).transpose()
    }
}

#[derive(Debug, Serialize)]
pub struct AdminCourseResponse {
    #[serde(flatten)]
    pub course: Course,
    pub exercises: Vec<Exercise>,
}
