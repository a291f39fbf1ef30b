//! Purchase lifecycle: `PENDING -> APPROVED | REJECTED`.
//!
//! Only this module moves a purchase out of `PENDING`, and approval is the
//! only path that creates an entitlement.

use tracing::{debug, info, warn};

use super::access;
use crate::error::{Error, Result};
use crate::notify::Outbox;
use crate::store::Store;
use crate::types::{NewPurchase, Principal, Purchase, PurchaseStatus, PurchaseSummary};

/// Records a payment proof for a paid course and alerts the administrator.
///
/// `attachment` is the opaque name returned by the upload storage. A user
/// may have only one purchase per course awaiting review; the store enforces
/// that with a unique index, so concurrent submissions cannot both succeed.
pub fn submit_purchase(
    store: &dyn Store,
    outbox: &Outbox,
    principal: &Principal,
    course_id: i64,
    attachment: Option<String>,
) -> Result<Purchase> {
    let course = access::load_course(store, course_id)?;

    if course.is_free {
        return Err(Error::invalid("free courses do not require a purchase"));
    }

    let purchase = store.create_purchase(&NewPurchase {
        user_id: principal.id,
        course_id: course.id,
        attachment_path: attachment,
    })?;

    info!(
        "Purchase {} submitted by user {} for course {}",
        purchase.id, principal.id, course.id
    );

    outbox.purchase_submitted(principal, &course, &purchase);

    Ok(purchase)
}

/// Lists purchases in one status, newest first. Defaults to `PENDING`.
pub fn list_purchases(
    store: &dyn Store,
    status: Option<PurchaseStatus>,
) -> Result<Vec<PurchaseSummary>> {
    store.list_purchases_by_status(status.unwrap_or_default())
}

pub fn list_user_purchases(store: &dyn Store, principal: &Principal) -> Result<Vec<PurchaseSummary>> {
    store.list_user_purchases(principal.id)
}

/// Approves a purchase and unlocks its course for the buyer.
///
/// Approving an already approved purchase is a no-op that re-asserts the
/// entitlement; the buyer is only notified on the actual transition.
pub fn approve_purchase(store: &dyn Store, outbox: &Outbox, purchase_id: i64) -> Result<Purchase> {
    let change = store
        .approve_purchase(purchase_id)?
        .ok_or(Error::NotFound("purchase"))?;

    match change.purchase.status {
        PurchaseStatus::Approved if change.transitioned() => {
            info!(
                "Purchase {} approved, course {} unlocked for user {}",
                purchase_id, change.purchase.course_id, change.purchase.user_id
            );
            match store.get_purchase_summary(purchase_id) {
                Ok(Some(summary)) => {
                    outbox.course_unlocked(&summary);
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to load purchase {purchase_id} for notification: {e}"),
            }
            Ok(change.purchase)
        }
        PurchaseStatus::Approved => {
            if change.entitlement_created {
                warn!(
                    "Purchase {purchase_id} was approved without an entitlement; restored access for user {}",
                    change.purchase.user_id
                );
            } else {
                debug!("Purchase {purchase_id} was already approved");
            }
            Ok(change.purchase)
        }
        PurchaseStatus::Rejected => Err(Error::invalid("purchase was already rejected")),
        PurchaseStatus::Pending => Err(Error::invalid("purchase could not be approved")),
    }
}

/// Rejects a pending purchase. No entitlement is created and the buyer is
/// not notified.
pub fn reject_purchase(store: &dyn Store, purchase_id: i64) -> Result<Purchase> {
    let change = store
        .reject_purchase(purchase_id)?
        .ok_or(Error::NotFound("purchase"))?;

    match change.purchase.status {
        PurchaseStatus::Rejected => {
            if change.transitioned() {
                info!("Purchase {purchase_id} rejected");
            }
            Ok(change.purchase)
        }
        PurchaseStatus::Approved => Err(Error::invalid("purchase was already approved")),
        PurchaseStatus::Pending => Err(Error::invalid("purchase could not be rejected")),
    }
}

/// Returns the stored attachment name of a purchase's payment proof.
pub fn purchase_attachment(store: &dyn Store, purchase_id: i64) -> Result<String> {
    store
        .get_purchase(purchase_id)?
        .ok_or(Error::NotFound("purchase"))?
        .attachment_path
        .ok_or(Error::NotFound("attachment"))
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use super::*;
    use crate::enrollment::testing::{Fixture, principal};
    use crate::enrollment::{access::can_access_course, ledger, progress};

    #[test]
    fn test_submit_creates_pending_purchase_and_alerts_admin() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");

        let purchase = submit_purchase(
            fx.store(),
            &fx.outbox,
            &principal(&user),
            fx.paid_course.id,
            Some("proof.png".to_string()),
        )
        .unwrap();

        assert_eq!(purchase.status, PurchaseStatus::Pending);
        assert_eq!(purchase.attachment_path.as_deref(), Some("proof.png"));

        let sent = fx.deliver();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "admin@example.com");
        assert!(sent[0].body.contains(&purchase.id.to_string()));
        assert!(sent[0].attachment_path.as_deref().unwrap().ends_with("proof.png"));
    }

    #[test]
    fn test_submit_unknown_course() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");

        let result = submit_purchase(fx.store(), &fx.outbox, &principal(&user), 999, None);
        assert!(matches!(result, Err(Error::NotFound("course"))));
    }

    #[test]
    fn test_submit_free_course_creates_nothing() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");

        let result =
            submit_purchase(fx.store(), &fx.outbox, &principal(&user), fx.free_course.id, None);

        assert!(matches!(result, Err(Error::InvalidOperation(_))));
        assert!(list_user_purchases(fx.store(), &principal(&user)).unwrap().is_empty());
        assert!(fx.deliver().is_empty());
    }

    #[test]
    fn test_second_pending_submission_rejected() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");
        let p = principal(&user);

        submit_purchase(fx.store(), &fx.outbox, &p, fx.paid_course.id, None).unwrap();
        let again = submit_purchase(fx.store(), &fx.outbox, &p, fx.paid_course.id, None);

        assert!(matches!(again, Err(Error::InvalidOperation(_))));
        assert_eq!(list_purchases(fx.store(), None).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_submissions_leave_one_pending() {
        const THREADS: usize = 8;

        for round in 0..20 {
            let fx = Fixture::new();
            let user = fx.user(&format!("ana{round}@example.com"));
            let p = principal(&user);
            let barrier = Barrier::new(THREADS);

            let accepted = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..THREADS)
                    .map(|_| {
                        scope.spawn(|| {
                            barrier.wait();
                            submit_purchase(fx.store(), &fx.outbox, &p, fx.paid_course.id, None)
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .filter(|result| match result {
                        Ok(_) => true,
                        Err(Error::InvalidOperation(_)) => false,
                        Err(e) => panic!("unexpected error: {e}"),
                    })
                    .count()
            });

            assert_eq!(accepted, 1);
            assert_eq!(list_purchases(fx.store(), None).unwrap().len(), 1);
            assert_eq!(fx.deliver().len(), 1);
        }
    }

    #[test]
    fn test_resubmission_allowed_after_rejection() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");
        let p = principal(&user);

        let first = submit_purchase(fx.store(), &fx.outbox, &p, fx.paid_course.id, None).unwrap();
        reject_purchase(fx.store(), first.id).unwrap();

        let second = submit_purchase(fx.store(), &fx.outbox, &p, fx.paid_course.id, None).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_notifier_failure_keeps_purchase() {
        let fx = Fixture::new();
        fx.notifier.fail(true);
        let user = fx.user("ana@example.com");

        let purchase =
            submit_purchase(fx.store(), &fx.outbox, &principal(&user), fx.paid_course.id, None)
                .unwrap();
        let report = fx.outbox.dispatch_pending().unwrap();

        assert_eq!(report.failed, 1);
        let stored = fx.store().get_purchase(purchase.id).unwrap().unwrap();
        assert_eq!(stored.status, PurchaseStatus::Pending);
    }

    #[test]
    fn test_approval_scenario() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");
        let p = principal(&user);

        let purchase = submit_purchase(fx.store(), &fx.outbox, &p, fx.paid_course.id, None).unwrap();
        assert!(!can_access_course(fx.store(), &p, &fx.paid_course).unwrap());

        let approved = approve_purchase(fx.store(), &fx.outbox, purchase.id).unwrap();
        assert_eq!(approved.status, PurchaseStatus::Approved);
        assert!(can_access_course(fx.store(), &p, &fx.paid_course).unwrap());

        let sent = fx.deliver();
        let recipients: Vec<&str> = sent.iter().map(|n| n.recipient.as_str()).collect();
        assert_eq!(recipients, ["admin@example.com", "ana@example.com"]);

        for exercise in &fx.paid_exercises {
            progress::mark_completed(fx.store(), &p, exercise.id).unwrap();
        }
        assert_eq!(
            progress::list_completed(fx.store(), &p, fx.paid_course.id).unwrap().len(),
            fx.paid_exercises.len()
        );
    }

    #[test]
    fn test_double_approval_keeps_one_entitlement_and_one_notice() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");

        let purchase =
            submit_purchase(fx.store(), &fx.outbox, &principal(&user), fx.paid_course.id, None)
                .unwrap();
        approve_purchase(fx.store(), &fx.outbox, purchase.id).unwrap();
        approve_purchase(fx.store(), &fx.outbox, purchase.id).unwrap();

        assert_eq!(fx.store().list_user_entitlements(user.id).unwrap().len(), 1);
        let unlock_notices = fx
            .deliver()
            .into_iter()
            .filter(|n| n.recipient == "ana@example.com")
            .count();
        assert_eq!(unlock_notices, 1);
    }

    #[test]
    fn test_reapproval_restores_missing_entitlement() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");
        let p = principal(&user);

        let purchase = submit_purchase(fx.store(), &fx.outbox, &p, fx.paid_course.id, None).unwrap();
        approve_purchase(fx.store(), &fx.outbox, purchase.id).unwrap();
        fx.store
            .connection()
            .execute("DELETE FROM user_courses", [])
            .unwrap();
        assert!(!can_access_course(fx.store(), &p, &fx.paid_course).unwrap());

        let again = approve_purchase(fx.store(), &fx.outbox, purchase.id).unwrap();
        assert_eq!(again.status, PurchaseStatus::Approved);
        assert!(can_access_course(fx.store(), &p, &fx.paid_course).unwrap());
        assert_eq!(
            fx.deliver()
                .iter()
                .filter(|n| n.recipient == "ana@example.com")
                .count(),
            1
        );
    }

    #[test]
    fn test_rejection_scenario() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");
        let p = principal(&user);

        let purchase = submit_purchase(fx.store(), &fx.outbox, &p, fx.paid_course.id, None).unwrap();
        let rejected = reject_purchase(fx.store(), purchase.id).unwrap();

        assert_eq!(rejected.status, PurchaseStatus::Rejected);
        assert!(fx.store().list_user_entitlements(user.id).unwrap().is_empty());
        assert!(!can_access_course(fx.store(), &p, &fx.paid_course).unwrap());

        let to_buyer = fx.deliver().iter().filter(|n| n.recipient == user.email).count();
        assert_eq!(to_buyer, 0);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");
        let p = principal(&user);

        let rejected = submit_purchase(fx.store(), &fx.outbox, &p, fx.paid_course.id, None).unwrap();
        reject_purchase(fx.store(), rejected.id).unwrap();
        let result = approve_purchase(fx.store(), &fx.outbox, rejected.id);
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
        assert!(fx.store().list_user_entitlements(user.id).unwrap().is_empty());

        let approved = submit_purchase(fx.store(), &fx.outbox, &p, fx.paid_course.id, None).unwrap();
        approve_purchase(fx.store(), &fx.outbox, approved.id).unwrap();
        let result = reject_purchase(fx.store(), approved.id);
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn test_entitlement_survives_later_purchase_activity() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");
        let p = principal(&user);
        ledger::grant_entitlement(fx.store(), user.id, fx.paid_course.id).unwrap();

        let purchase = submit_purchase(fx.store(), &fx.outbox, &p, fx.paid_course.id, None).unwrap();
        reject_purchase(fx.store(), purchase.id).unwrap();

        assert!(can_access_course(fx.store(), &p, &fx.paid_course).unwrap());
    }

    #[test]
    fn test_unknown_purchase_review() {
        let fx = Fixture::new();
        assert!(matches!(
            approve_purchase(fx.store(), &fx.outbox, 77),
            Err(Error::NotFound("purchase"))
        ));
        assert!(matches!(
            reject_purchase(fx.store(), 77),
            Err(Error::NotFound("purchase"))
        ));
    }

    #[test]
    fn test_list_defaults_to_pending() {
        let fx = Fixture::new();
        let ana = fx.user("ana@example.com");
        let bob = fx.user("bob@example.com");

        let a = submit_purchase(fx.store(), &fx.outbox, &principal(&ana), fx.paid_course.id, None)
            .unwrap();
        submit_purchase(fx.store(), &fx.outbox, &principal(&bob), fx.paid_course.id, None).unwrap();
        approve_purchase(fx.store(), &fx.outbox, a.id).unwrap();

        let pending = list_purchases(fx.store(), None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].user_email, "bob@example.com");

        let approved = list_purchases(fx.store(), Some(PurchaseStatus::Approved)).unwrap();
        assert_eq!(approved[0].purchase.id, a.id);
    }

    #[test]
    fn test_purchase_attachment_lookup() {
        let fx = Fixture::new();
        let user = fx.user("ana@example.com");
        let p = principal(&user);

        let without = submit_purchase(fx.store(), &fx.outbox, &p, fx.paid_course.id, None).unwrap();
        assert!(matches!(
            purchase_attachment(fx.store(), without.id),
            Err(Error::NotFound("attachment"))
        ));
        reject_purchase(fx.store(), without.id).unwrap();

        let with = submit_purchase(
            fx.store(),
            &fx.outbox,
            &p,
            fx.paid_course.id,
            Some("abc.pdf".to_string()),
        )
        .unwrap();
        assert_eq!(purchase_attachment(fx.store(), with.id).unwrap(), "abc.pdf");
    }
}
