use std::path::PathBuf;

use crate::types::{Course, NewNotification, Principal, Purchase, PurchaseSummary};

/// Values the message templates need from the server configuration.
#[derive(Debug, Clone)]
pub struct NoticeSettings {
    /// Recipient of purchase alerts.
    pub admin_email: String,
    /// PIX key the buyer was told to pay to; echoed in admin alerts.
    pub pix_key: String,
    pub product_name: String,
    /// Directory holding proof files, used to resolve attachment names.
    pub uploads_dir: PathBuf,
}

pub fn purchase_submitted(
    settings: &NoticeSettings,
    requester: &Principal,
    course: &Course,
    purchase: &Purchase,
) -> NewNotification {
    let body = format!(
        "A new payment proof is waiting for review.\n\
         \n\
         Name: {}\n\
         Email: {}\n\
         Course: {}\n\
         Date: {}\n\
         Purchase ID: {}\n\
         PIX sent to: {}\n",
        requester.name,
        requester.email,
        course.name,
        purchase.created_at.to_rfc3339(),
        purchase.id,
        settings.pix_key,
    );

    NewNotification {
        recipient: settings.admin_email.clone(),
        subject: format!("New payment proof - {}", settings.product_name),
        body,
        attachment_path: purchase
            .attachment_path
            .as_ref()
            .map(|name| settings.uploads_dir.join(name).to_string_lossy().into_owned()),
    }
}

pub fn course_unlocked(settings: &NoticeSettings, summary: &PurchaseSummary) -> NewNotification {
    NewNotification {
        recipient: summary.user_email.clone(),
        subject: format!("Your course is unlocked - {}", settings.product_name),
        body: format!(
            "Hello {},\n\nYour payment was confirmed and the course {} is now unlocked.\n",
            summary.user_name, summary.course_name
        ),
        attachment_path: None,
    }
}
