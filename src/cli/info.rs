use serde::Serialize;

use crate::notify::MAX_ATTEMPTS;
use crate::store::{Store, StoreStats};
use crate::types::{DeliveryStatus, Role};

use super::init_store;

#[derive(Serialize)]
struct AdminOutput {
    id: i64,
    name: String,
    email: String,
    created_at: String,
}

#[derive(Serialize)]
struct CourseOutput {
    id: i64,
    name: String,
    is_free: bool,
    price_cents: i64,
    exercises: usize,
}

#[derive(Serialize)]
struct StuckNotificationOutput {
    id: String,
    recipient: String,
    subject: String,
    attempts: i32,
    last_error: Option<String>,
}

#[derive(Serialize)]
struct DetailedServerInfo {
    stats: StoreStats,
    admins: Vec<AdminOutput>,
    courses: Vec<CourseOutput>,
    /// Notifications that exhausted their delivery attempts.
    stuck_notifications: Vec<StuckNotificationOutput>,
}

pub fn run_info(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let stats = store.stats()?;

    if json {
        let admins = store
            .list_users()?
            .into_iter()
            .filter(|u| u.role == Role::Admin)
            .map(|u| AdminOutput {
                id: u.id,
                name: u.name,
                email: u.email,
                created_at: u.created_at.to_rfc3339(),
            })
            .collect();

        let mut courses = Vec::new();
        for course in store.list_courses()? {
            courses.push(CourseOutput {
                exercises: store.list_course_exercises(course.id)?.len(),
                id: course.id,
                name: course.name,
                is_free: course.is_free,
                price_cents: course.price_cents,
            });
        }

        let stuck_notifications = store
            .list_notifications()?
            .into_iter()
            .filter(|n| n.status != DeliveryStatus::Sent && n.attempts >= MAX_ATTEMPTS)
            .map(|n| StuckNotificationOutput {
                id: n.id,
                recipient: n.recipient,
                subject: n.subject,
                attempts: n.attempts,
                last_error: n.last_error,
            })
            .collect();

        let info = DetailedServerInfo {
            stats,
            admins,
            courses,
            stuck_notifications,
        };

        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!();
        println!("Coursegate Server Status");
        println!("{}", "─".repeat(24));
        println!("Users:          {} ({} admin)", stats.users, stats.admins);
        println!("Courses:        {}", stats.courses);
        println!("Exercises:      {}", stats.exercises);
        println!("Pending review: {}", stats.pending_purchases);
        println!("Unlocked:       {}", stats.entitlements);
        println!("Undelivered:    {}", stats.undelivered_notifications);
        println!();
    }

    Ok(())
}
