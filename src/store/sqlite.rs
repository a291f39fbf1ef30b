use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::schema::SCHEMA;
use super::seed::{CatalogCourse, ImportSummary};
use super::{StatusChange, Store, StoreStats};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database. Used by tests and tooling.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_column<T: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn insert_course(conn: &Connection, course: &NewCourse) -> Result<Course> {
    conn.execute(
        "INSERT INTO courses (name, description, price_cents, is_free) VALUES (?1, ?2, ?3, ?4)",
        params![
            course.name,
            course.description,
            course.price_cents,
            course.is_free
        ],
    )?;

    Ok(Course {
        id: conn.last_insert_rowid(),
        name: course.name.clone(),
        description: course.description.clone(),
        price_cents: course.price_cents,
        is_free: course.is_free,
    })
}

fn insert_exercise(conn: &Connection, exercise: &NewExercise) -> Result<Exercise> {
    let result = conn.execute(
        "INSERT INTO exercises (course_id, title, statement, difficulty, initial_code, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            exercise.course_id,
            exercise.title,
            exercise.statement,
            exercise.difficulty,
            exercise.initial_code,
            exercise.order,
        ],
    );

    match result {
        Ok(_) => Ok(Exercise {
            id: conn.last_insert_rowid(),
            course_id: exercise.course_id,
            title: exercise.title.clone(),
            statement: exercise.statement.clone(),
            difficulty: exercise.difficulty.clone(),
            initial_code: exercise.initial_code.clone(),
            order: exercise.order,
        }),
        Err(e) if is_constraint_violation(&e) => Err(Error::NotFound("course")),
        Err(e) => Err(Error::from(e)),
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: parse_column(row, 4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at";

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: parse_datetime(&row.get::<_, String>(5)?),
        last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
    })
}

const COURSE_COLUMNS: &str = "id, name, description, price_cents, is_free";

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price_cents: row.get(3)?,
        is_free: row.get(4)?,
    })
}

const EXERCISE_COLUMNS: &str =
    "id, course_id, title, statement, difficulty, initial_code, position";

fn exercise_from_row(row: &Row<'_>) -> rusqlite::Result<Exercise> {
    Ok(Exercise {
        id: row.get(0)?,
        course_id: row.get(1)?,
        title: row.get(2)?,
        statement: row.get(3)?,
        difficulty: row.get(4)?,
        initial_code: row.get(5)?,
        order: row.get(6)?,
    })
}

const PURCHASE_COLUMNS: &str =
    "p.id, p.user_id, p.course_id, p.status, p.attachment_path, p.created_at, p.reviewed_at";

fn purchase_from_row(row: &Row<'_>) -> rusqlite::Result<Purchase> {
    Ok(Purchase {
        id: row.get(0)?,
        user_id: row.get(1)?,
        course_id: row.get(2)?,
        status: parse_column(row, 3)?,
        attachment_path: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        reviewed_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
    })
}

fn purchase_summary_from_row(row: &Row<'_>) -> rusqlite::Result<PurchaseSummary> {
    Ok(PurchaseSummary {
        purchase: purchase_from_row(row)?,
        user_name: row.get(7)?,
        user_email: row.get(8)?,
        course_name: row.get(9)?,
    })
}

const NOTIFICATION_COLUMNS: &str = "id, recipient, subject, body, attachment_path, status, attempts, last_error, created_at, sent_at";

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        recipient: row.get(1)?,
        subject: row.get(2)?,
        body: row.get(3)?,
        attachment_path: row.get(4)?,
        status: parse_column(row, 5)?,
        attempts: row.get(6)?,
        last_error: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        sent_at: row.get::<_, Option<String>>(9)?.map(|s| parse_datetime(&s)),
    })
}

fn query_purchase(conn: &Connection, id: i64) -> Result<Option<Purchase>> {
    conn.query_row(
        &format!("SELECT {PURCHASE_COLUMNS} FROM purchases p WHERE p.id = ?1"),
        params![id],
        purchase_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn query_purchase_summaries(
    conn: &Connection,
    filter: &str,
    value: &dyn rusqlite::ToSql,
) -> Result<Vec<PurchaseSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PURCHASE_COLUMNS}, u.name, u.email, c.name
         FROM purchases p
         JOIN users u ON u.id = p.user_id
         JOIN courses c ON c.id = p.course_id
         WHERE {filter} = ?1
         ORDER BY p.created_at DESC, p.id DESC"
    ))?;

    let rows = stmt.query_map(params![value], purchase_summary_from_row)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

fn count(conn: &Connection, sql: &str) -> Result<i64> {
    conn.query_row(sql, [], |row| row.get(0)).map_err(Error::from)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &NewUser) -> Result<User> {
        let conn = self.conn();
        let now = Utc::now();
        let result = conn.execute(
            "INSERT INTO users (name, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.name,
                user.email,
                user.password_hash,
                user.role.as_str(),
                format_datetime(&now),
            ],
        );

        match result {
            Ok(_) => Ok(User {
                id: conn.last_insert_rowid(),
                name: user.name.clone(),
                email: user.email.clone(),
                password_hash: user.password_hash.clone(),
                role: user.role,
                created_at: now,
            }),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists("email")),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))?;

        let rows = stmt.query_map([], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn has_admin_user(&self) -> Result<bool> {
        let admins = count(&self.conn(), "SELECT COUNT(*) FROM users WHERE role = 'admin'")?;
        Ok(admins > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                format_datetime(&token.expires_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        self.conn()
            .query_row(
                &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
                params![lookup],
                token_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn delete_expired_tokens(&self) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM tokens WHERE expires_at < ?1",
            params![format_datetime(&Utc::now())],
        )?;
        Ok(rows)
    }

    // Catalog operations

    fn create_course(&self, course: &NewCourse) -> Result<Course> {
        insert_course(&self.conn(), course)
    }

    fn get_course(&self, id: i64) -> Result<Option<Course>> {
        self.conn()
            .query_row(
                &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"),
                params![id],
                course_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_courses(&self) -> Result<Vec<Course>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {COURSE_COLUMNS} FROM courses ORDER BY id"))?;

        let rows = stmt.query_map([], course_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn create_exercise(&self, exercise: &NewExercise) -> Result<Exercise> {
        insert_exercise(&self.conn(), exercise)
    }

    fn import_courses(&self, courses: &[CatalogCourse]) -> Result<ImportSummary> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut summary = ImportSummary::default();

        for entry in courses {
            let course = insert_course(&tx, &entry.course)?;
            summary.courses += 1;

            for exercise in &entry.exercises {
                insert_exercise(
                    &tx,
                    &NewExercise {
                        course_id: course.id,
                        ..exercise.clone()
                    },
                )?;
                summary.exercises += 1;
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    fn get_exercise(&self, id: i64) -> Result<Option<Exercise>> {
        self.conn()
            .query_row(
                &format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = ?1"),
                params![id],
                exercise_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_course_exercises(&self, course_id: i64) -> Result<Vec<Exercise>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE course_id = ?1 ORDER BY position ASC, id ASC"
        ))?;

        let rows = stmt.query_map(params![course_id], exercise_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_exercises(&self) -> Result<Vec<Exercise>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises ORDER BY course_id, position ASC, id ASC"
        ))?;

        let rows = stmt.query_map([], exercise_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Entitlement operations

    fn has_entitlement(&self, user_id: i64, course_id: i64) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM user_courses WHERE user_id = ?1 AND course_id = ?2",
                params![user_id, course_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn grant_entitlement(&self, user_id: i64, course_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "INSERT OR IGNORE INTO user_courses (user_id, course_id, unlocked_at) VALUES (?1, ?2, ?3)",
            params![user_id, course_id, format_datetime(&Utc::now())],
        )?;
        Ok(rows > 0)
    }

    fn list_user_entitlements(&self, user_id: i64) -> Result<Vec<Entitlement>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, course_id, unlocked_at FROM user_courses
             WHERE user_id = ?1 ORDER BY course_id",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Entitlement {
                user_id: row.get(0)?,
                course_id: row.get(1)?,
                unlocked_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Progress operations

    fn upsert_progress(&self, user_id: i64, exercise_id: i64) -> Result<()> {
        self.conn().execute(
            "INSERT INTO exercise_progress (user_id, exercise_id, completed, completed_at)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT (user_id, exercise_id) DO UPDATE SET
                completed = 1,
                completed_at = excluded.completed_at",
            params![user_id, exercise_id, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn get_progress(&self, user_id: i64, exercise_id: i64) -> Result<Option<ExerciseProgress>> {
        self.conn()
            .query_row(
                "SELECT user_id, exercise_id, completed, completed_at FROM exercise_progress
                 WHERE user_id = ?1 AND exercise_id = ?2",
                params![user_id, exercise_id],
                |row| {
                    Ok(ExerciseProgress {
                        user_id: row.get(0)?,
                        exercise_id: row.get(1)?,
                        completed: row.get(2)?,
                        completed_at: row.get::<_, Option<String>>(3)?.map(|s| parse_datetime(&s)),
                    })
                },
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_completed_exercises(&self, user_id: i64, course_id: i64) -> Result<Vec<i64>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT ep.exercise_id FROM exercise_progress ep
             JOIN exercises e ON e.id = ep.exercise_id
             WHERE ep.user_id = ?1 AND e.course_id = ?2 AND ep.completed = 1
             ORDER BY e.position ASC, e.id ASC",
        )?;

        let rows = stmt.query_map(params![user_id, course_id], |row| row.get(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Purchase operations

    fn create_purchase(&self, purchase: &NewPurchase) -> Result<Purchase> {
        let conn = self.conn();
        let now = Utc::now();
        let result = conn.execute(
            "INSERT INTO purchases (user_id, course_id, status, attachment_path, created_at)
             VALUES (?1, ?2, 'PENDING', ?3, ?4)",
            params![
                purchase.user_id,
                purchase.course_id,
                purchase.attachment_path,
                format_datetime(&now),
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::invalid(
                    "a purchase for this course is already awaiting review",
                ));
            }
            Err(e) => return Err(Error::from(e)),
        }

        Ok(Purchase {
            id: conn.last_insert_rowid(),
            user_id: purchase.user_id,
            course_id: purchase.course_id,
            status: PurchaseStatus::Pending,
            attachment_path: purchase.attachment_path.clone(),
            created_at: now,
            reviewed_at: None,
        })
    }

    fn get_purchase(&self, id: i64) -> Result<Option<Purchase>> {
        query_purchase(&self.conn(), id)
    }

    fn get_purchase_summary(&self, id: i64) -> Result<Option<PurchaseSummary>> {
        let conn = self.conn();
        Ok(query_purchase_summaries(&conn, "p.id", &id)?.into_iter().next())
    }

    fn list_purchases_by_status(&self, status: PurchaseStatus) -> Result<Vec<PurchaseSummary>> {
        query_purchase_summaries(&self.conn(), "p.status", &status.as_str())
    }

    fn list_user_purchases(&self, user_id: i64) -> Result<Vec<PurchaseSummary>> {
        query_purchase_summaries(&self.conn(), "p.user_id", &user_id)
    }

    fn approve_purchase(&self, id: i64) -> Result<Option<StatusChange>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let Some(before) = query_purchase(&tx, id)? else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE purchases SET status = 'APPROVED', reviewed_at = ?1
             WHERE id = ?2 AND status = 'PENDING'",
            params![format_datetime(&Utc::now()), id],
        )?;

        let after = query_purchase(&tx, id)?.ok_or(Error::NotFound("purchase"))?;

        let entitlement_created = if after.status == PurchaseStatus::Approved {
            tx.execute(
                "INSERT OR IGNORE INTO user_courses (user_id, course_id, unlocked_at)
                 VALUES (?1, ?2, ?3)",
                params![after.user_id, after.course_id, format_datetime(&Utc::now())],
            )? > 0
        } else {
            false
        };

        tx.commit()?;

        Ok(Some(StatusChange {
            purchase: after,
            previous: before.status,
            entitlement_created,
        }))
    }

    fn reject_purchase(&self, id: i64) -> Result<Option<StatusChange>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let Some(before) = query_purchase(&tx, id)? else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE purchases SET status = 'REJECTED', reviewed_at = ?1
             WHERE id = ?2 AND status = 'PENDING'",
            params![format_datetime(&Utc::now()), id],
        )?;

        let after = query_purchase(&tx, id)?.ok_or(Error::NotFound("purchase"))?;
        tx.commit()?;

        Ok(Some(StatusChange {
            purchase: after,
            previous: before.status,
            entitlement_created: false,
        }))
    }

    // Notification outbox

    fn create_notification(&self, notification: &NewNotification) -> Result<Notification> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        self.conn().execute(
            "INSERT INTO notifications (id, recipient, subject, body, attachment_path, status, attempts, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'PENDING', 0, ?6)",
            params![
                id,
                notification.recipient,
                notification.subject,
                notification.body,
                notification.attachment_path,
                format_datetime(&now),
            ],
        )?;

        Ok(Notification {
            id,
            recipient: notification.recipient.clone(),
            subject: notification.subject.clone(),
            body: notification.body.clone(),
            attachment_path: notification.attachment_path.clone(),
            status: DeliveryStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            sent_at: None,
        })
    }

    fn list_undelivered_notifications(
        &self,
        max_attempts: i32,
        limit: i32,
    ) -> Result<Vec<Notification>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE status != 'SENT' AND attempts < ?1
             ORDER BY created_at ASC, rowid ASC LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![max_attempts, limit], notification_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_notifications(&self) -> Result<Vec<Notification>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications ORDER BY created_at ASC, rowid ASC"
        ))?;

        let rows = stmt.query_map([], notification_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn mark_notification_sent(&self, id: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE notifications SET status = 'SENT', attempts = attempts + 1, last_error = NULL, sent_at = ?1
             WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound("notification"));
        }
        Ok(())
    }

    fn mark_notification_failed(&self, id: &str, error: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE notifications SET status = 'FAILED', attempts = attempts + 1, last_error = ?1
             WHERE id = ?2",
            params![error, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound("notification"));
        }
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn();
        Ok(StoreStats {
            users: count(&conn, "SELECT COUNT(*) FROM users")?,
            admins: count(&conn, "SELECT COUNT(*) FROM users WHERE role = 'admin'")?,
            courses: count(&conn, "SELECT COUNT(*) FROM courses")?,
            exercises: count(&conn, "SELECT COUNT(*) FROM exercises")?,
            pending_purchases: count(
                &conn,
                "SELECT COUNT(*) FROM purchases WHERE status = 'PENDING'",
            )?,
            entitlements: count(&conn, "SELECT COUNT(*) FROM user_courses")?,
            undelivered_notifications: count(
                &conn,
                "SELECT COUNT(*) FROM notifications WHERE status != 'SENT'",
            )?,
        })
    }

    fn close(&self) -> Result<()> {
        let conn = self.conn();
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        Ok(())
    }
}
