use std::collections::HashSet;

use crate::error::Result;
use crate::store::Store;

pub fn has_entitlement(store: &dyn Store, user_id: i64, course_id: i64) -> Result<bool> {
    store.has_entitlement(user_id, course_id)
}

/// Inserts the entitlement if absent. Returns whether a row was created.
/// There is no revoke: once granted, access is permanent.
pub fn grant_entitlement(store: &dyn Store, user_id: i64, course_id: i64) -> Result<bool> {
    let created = store.grant_entitlement(user_id, course_id)?;
    if created {
        tracing::info!("Unlocked course {course_id} for user {user_id}");
    }
    Ok(created)
}

pub fn unlocked_course_ids(store: &dyn Store, user_id: i64) -> Result<HashSet<i64>> {
    Ok(store
        .list_user_entitlements(user_id)?
        .into_iter()
        .map(|e| e.course_id)
        .collect())
}
