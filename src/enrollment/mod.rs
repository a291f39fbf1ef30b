//! Course access rules, the entitlement ledger, exercise progress and the
//! manual purchase workflow.
//!
//! Every function takes the store as `&dyn Store` so the HTTP handlers and
//! the CLI share one implementation of each rule.

pub mod access;
pub mod ledger;
pub mod progress;
pub mod purchases;

pub use access::{can_access_course, list_courses_for, load_course, require_course_access};
pub use progress::{course_exercises, list_completed, mark_completed};
pub use purchases::{
    approve_purchase, list_purchases, list_user_purchases, purchase_attachment, reject_purchase,
    submit_purchase,
};
