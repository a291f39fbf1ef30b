use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Notifier;
use super::templates::{self, NoticeSettings};
use crate::error::Result;
use crate::store::Store;
use crate::types::{Course, NewNotification, Notification, Principal, Purchase, PurchaseSummary};

/// Deliveries attempted per notification before it is left for inspection.
pub const MAX_ATTEMPTS: i32 = 5;

const DISPATCH_BATCH: i32 = 50;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct Outbox {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    settings: NoticeSettings,
    wakeup: Notify,
}

impl Outbox {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, settings: NoticeSettings) -> Self {
        Self {
            store,
            notifier,
            settings,
            wakeup: Notify::new(),
        }
    }

    /// Queues the administrator alert for a new purchase.
    pub fn purchase_submitted(
        &self,
        requester: &Principal,
        course: &Course,
        purchase: &Purchase,
    ) -> Option<Notification> {
        self.enqueue(templates::purchase_submitted(
            &self.settings,
            requester,
            course,
            purchase,
        ))
    }

    /// Queues the "course unlocked" message for the buyer.
    pub fn course_unlocked(&self, summary: &PurchaseSummary) -> Option<Notification> {
        self.enqueue(templates::course_unlocked(&self.settings, summary))
    }

    /// Persists a notification and wakes the dispatcher. Failures are logged
    /// and swallowed: the change that triggered the message is already committed.
    pub fn enqueue(&self, notification: NewNotification) -> Option<Notification> {
        match self.store.create_notification(&notification) {
            Ok(queued) => {
                self.wakeup.notify_one();
                Some(queued)
            }
            Err(e) => {
                warn!(
                    "Failed to queue notification '{}' for {}: {e}",
                    notification.subject, notification.recipient
                );
                None
            }
        }
    }

    /// Attempts delivery of every undelivered notification under the retry limit.
    pub fn dispatch_pending(&self) -> Result<DispatchReport> {
        let pending = self
            .store
            .list_undelivered_notifications(MAX_ATTEMPTS, DISPATCH_BATCH)?;

        let mut report = DispatchReport::default();

        for notification in &pending {
            report.attempted += 1;
            match self.notifier.deliver(notification) {
                Ok(()) => {
                    self.store.mark_notification_sent(&notification.id)?;
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to deliver notification {} to {} (attempt {}): {e}",
                        notification.id,
                        notification.recipient,
                        notification.attempts + 1
                    );
                    self.store
                        .mark_notification_failed(&notification.id, &e.to_string())?;
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Background dispatcher: drains the outbox whenever something is queued
    /// and retries failed deliveries every `retry_every`.
    pub async fn run(self: Arc<Self>, retry_every: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(retry_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = self.wakeup.notified() => {}
                _ = ticker.tick() => {}
            }

            let outbox = Arc::clone(&self);
            match tokio::task::spawn_blocking(move || outbox.dispatch_pending()).await {
                Ok(Ok(report)) if report.attempted > 0 => {
                    info!(
                        "Dispatched notifications: {} sent, {} failed",
                        report.sent, report.failed
                    );
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Notification dispatch failed: {e}"),
                Err(e) => warn!("Notification dispatcher task failed: {e}"),
            }
        }

        info!("Notification dispatcher stopped");
    }
}
