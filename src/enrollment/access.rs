use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Course, CourseWithAccess, Principal};

use super::ledger;

/// Returns true if the principal may view the course's exercises.
///
/// Checked in order: admin role, free course, entitlement row.
pub fn can_access_course(store: &dyn Store, principal: &Principal, course: &Course) -> Result<bool> {
    if principal.is_admin() {
        return Ok(true);
    }

    if course.is_free {
        return Ok(true);
    }

    ledger::has_entitlement(store, principal.id, course.id)
}

/// Check course access, returning a forbidden error if the course is locked.
pub fn require_course_access(
    store: &dyn Store,
    principal: &Principal,
    course: &Course,
) -> Result<()> {
    if !can_access_course(store, principal, course)? {
        return Err(Error::Forbidden("course is locked"));
    }
    Ok(())
}

pub fn load_course(store: &dyn Store, course_id: i64) -> Result<Course> {
    store.get_course(course_id)?.ok_or(Error::NotFound("course"))
}

/// Lists every course with the principal's computed `is_unlocked` flag.
pub fn list_courses_for(store: &dyn Store, principal: &Principal) -> Result<Vec<CourseWithAccess>> {
    let unlocked = ledger::unlocked_course_ids(store, principal.id)?;

    let courses = store
        .list_courses()?
        .into_iter()
        .map(|course| {
            let is_unlocked =
                principal.is_admin() || course.is_free || unlocked.contains(&course.id);
            CourseWithAccess {
                course,
                is_unlocked,
            }
        })
        .collect();

    Ok(courses)
}
