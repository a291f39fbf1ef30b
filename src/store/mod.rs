pub mod seed;
mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use serde::Serialize;

use crate::error::Result;
use crate::types::*;

/// Outcome of a review attempt on a purchase.
///
/// Status changes are compare-and-set: only a `PENDING` purchase moves, so
/// `previous` tells the caller whether this call performed the transition.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub purchase: Purchase,
    pub previous: PurchaseStatus,
    pub entitlement_created: bool,
}

impl StatusChange {
    #[must_use]
    pub fn transitioned(&self) -> bool {
        self.previous != self.purchase.status
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub users: i64,
    pub admins: i64,
    pub courses: i64,
    pub exercises: i64,
    pub pending_purchases: i64,
    pub entitlements: i64,
    pub undelivered_notifications: i64,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &NewUser) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn has_admin_user(&self) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn delete_expired_tokens(&self) -> Result<usize>;

    // Catalog operations
    fn create_course(&self, course: &NewCourse) -> Result<Course>;
    fn get_course(&self, id: i64) -> Result<Option<Course>>;
    fn list_courses(&self) -> Result<Vec<Course>>;
    fn create_exercise(&self, exercise: &NewExercise) -> Result<Exercise>;
    /// Inserts courses with their exercises in one transaction: either the
    /// whole batch lands or nothing does.
    fn import_courses(&self, courses: &[seed::CatalogCourse]) -> Result<seed::ImportSummary>;
    fn get_exercise(&self, id: i64) -> Result<Option<Exercise>>;
    fn list_course_exercises(&self, course_id: i64) -> Result<Vec<Exercise>>;
    fn list_exercises(&self) -> Result<Vec<Exercise>>;

    // Entitlement operations (user_courses)
    fn has_entitlement(&self, user_id: i64, course_id: i64) -> Result<bool>;
    fn grant_entitlement(&self, user_id: i64, course_id: i64) -> Result<bool>;
    fn list_user_entitlements(&self, user_id: i64) -> Result<Vec<Entitlement>>;

    // Progress operations
    fn upsert_progress(&self, user_id: i64, exercise_id: i64) -> Result<()>;
    fn get_progress(&self, user_id: i64, exercise_id: i64) -> Result<Option<ExerciseProgress>>;
    fn list_completed_exercises(&self, user_id: i64, course_id: i64) -> Result<Vec<i64>>;

    // Purchase operations
    fn create_purchase(&self, purchase: &NewPurchase) -> Result<Purchase>;
    fn get_purchase(&self, id: i64) -> Result<Option<Purchase>>;
    fn get_purchase_summary(&self, id: i64) -> Result<Option<PurchaseSummary>>;
    fn list_purchases_by_status(&self, status: PurchaseStatus) -> Result<Vec<PurchaseSummary>>;
    fn list_user_purchases(&self, user_id: i64) -> Result<Vec<PurchaseSummary>>;
    /// Atomically moves a pending purchase to APPROVED and inserts the
    /// entitlement if absent. Returns `None` for an unknown purchase.
    fn approve_purchase(&self, id: i64) -> Result<Option<StatusChange>>;
    /// Moves a pending purchase to REJECTED. Returns `None` for an unknown purchase.
    fn reject_purchase(&self, id: i64) -> Result<Option<StatusChange>>;

    // Notification outbox
    fn create_notification(&self, notification: &NewNotification) -> Result<Notification>;
    fn list_undelivered_notifications(
        &self,
        max_attempts: i32,
        limit: i32,
    ) -> Result<Vec<Notification>>;
    fn list_notifications(&self) -> Result<Vec<Notification>>;
    fn mark_notification_sent(&self, id: &str) -> Result<()>;
    fn mark_notification_failed(&self, id: &str, error: &str) -> Result<()>;

    fn stats(&self) -> Result<StoreStats>;

    fn close(&self) -> Result<()>;
}
