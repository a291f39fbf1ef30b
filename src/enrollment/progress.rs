use std::collections::BTreeSet;

use super::access;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Course, ExerciseWithProgress, Principal};

/// Marks an exercise as completed for the principal. Repeating the call
/// refreshes `completed_at` and never creates a second record.
pub fn mark_completed(store: &dyn Store, principal: &Principal, exercise_id: i64) -> Result<()> {
    let exercise = store
        .get_exercise(exercise_id)?
        .ok_or(Error::NotFound("exercise"))?;
    let course = access::load_course(store, exercise.course_id)?;

    access::require_course_access(store, principal, &course)?;

    store.upsert_progress(principal.id, exercise.id)
}

/// Completed exercise ids of a course. Locked courses are refused rather
/// than reported as empty.
pub fn list_completed(
    store: &dyn Store,
    principal: &Principal,
    course_id: i64,
) -> Result<BTreeSet<i64>> {
    let course = access::load_course(store, course_id)?;
    access::require_course_access(store, principal, &course)?;

    Ok(store
        .list_completed_exercises(principal.id, course.id)?
        .into_iter()
        .collect())
}

/// The course's exercises in display order, each flagged with the
/// principal's completion state.
pub fn course_exercises(
    store: &dyn Store,
    principal: &Principal,
    course_id: i64,
) -> Result<(Course, Vec<ExerciseWithProgress>)> {
    let course = access::load_course(store, course_id)?;
    access::require_course_access(store, principal, &course)?;

    let completed: BTreeSet<i64> = store
        .list_completed_exercises(principal.id, course.id)?
        .into_iter()
        .collect();

    let exercises = store
        .list_course_exercises(course.id)?
        .into_iter()
        .map(|exercise| ExerciseWithProgress {
            completed: completed.contains(&exercise.id),
            exercise,
        })
        .collect();

    Ok((course, exercises))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::ledger;
    use crate::enrollment::testing::{Fixture, admin, principal};

    #[test]
    fn test_locked_course_refuses_completion() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");

        let result = mark_completed(fx.store(), &principal(&user), fx.paid_exercises[0].id);

        assert!(matches!(result, Err(Error::Forbidden(_))));
        assert!(
            fx.store()
                .get_progress(user.id, fx.paid_exercises[0].id)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_completion_is_idempotent() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");
        let p = principal(&user);
        ledger::grant_entitlement(fx.store(), user.id, fx.paid_course.id).unwrap();
        let exercise = &fx.paid_exercises[0];

        mark_completed(fx.store(), &p, exercise.id).unwrap();
        mark_completed(fx.store(), &p, exercise.id).unwrap();

        let done = list_completed(fx.store(), &p, fx.paid_course.id).unwrap();
        assert_eq!(done, BTreeSet::from([exercise.id]));
        assert!(fx.store().get_progress(user.id, exercise.id).unwrap().unwrap().completed);
    }

    #[test]
    fn test_unknown_exercise() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");

        let result = mark_completed(fx.store(), &principal(&user), 12345);
        assert!(matches!(result, Err(Error::NotFound("exercise"))));
    }

    #[test]
    fn test_free_course_completion_without_entitlement() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");
        let p = principal(&user);

        mark_completed(fx.store(), &p, fx.free_exercises[1].id).unwrap();

        let (_, exercises) = course_exercises(fx.store(), &p, fx.free_course.id).unwrap();
        let flags: Vec<bool> = exercises.iter().map(|e| e.completed).collect();
        assert_eq!(flags, [false, true]);
    }

    #[test]
    fn test_progress_listing_requires_access() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");

        let result = list_completed(fx.store(), &principal(&user), fx.paid_course.id);
        assert!(matches!(result, Err(Error::Forbidden(_))));

        let result = list_completed(fx.store(), &principal(&user), 999);
        assert!(matches!(result, Err(Error::NotFound("course"))));
    }

    #[test]
    fn test_progress_is_scoped_to_course() {
        let fx = Fixture::new();
        let admin = admin(&fx);
        let p = principal(&admin);

        mark_completed(fx.store(), &p, fx.free_exercises[0].id).unwrap();
        mark_completed(fx.store(), &p, fx.paid_exercises[0].id).unwrap();

        let paid = list_completed(fx.store(), &p, fx.paid_course.id).unwrap();
        assert_eq!(paid, BTreeSet::from([fx.paid_exercises[0].id]));
    }

    #[test]
    fn test_exercises_of_locked_course_are_hidden() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");

        let result = course_exercises(fx.store(), &principal(&user), fx.paid_course.id);
        assert!(matches!(result, Err(Error::Forbidden(_))));
    }
}
