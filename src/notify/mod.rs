//! Notification outbox.
//!
//! Domain operations never talk to a mail transport directly. They enqueue a
//! row in the `notifications` table after their own state change committed;
//! the [`Outbox`] dispatcher later hands each row to a [`Notifier`] and records
//! the outcome. A failing transport therefore never undoes a purchase or an
//! approval.

mod outbox;
mod spool;
pub mod templates;

pub use outbox::{DispatchReport, MAX_ATTEMPTS, Outbox};
pub use spool::SpoolNotifier;
pub use templates::NoticeSettings;

use crate::error::Result;
use crate::types::Notification;

/// A message transport.
pub trait Notifier: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Writes messages to the log instead of sending them.
/// Used when no mail spool is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            to = %notification.recipient,
            subject = %notification.subject,
            attachment = notification.attachment_path.as_deref().unwrap_or("-"),
            "[mail:log]\n{}",
            notification.body
        );
        Ok(())
    }
}
