pub const SCHEMA: &str = r#"
-- Accounts; role is fixed at creation
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
    created_at TEXT DEFAULT (datetime('now'))
);

-- Session tokens; only the argon2 hash is kept
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,
    token_lookup TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT NOT NULL,
    last_used_at TEXT
);

CREATE TABLE IF NOT EXISTS courses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    price_cents INTEGER NOT NULL DEFAULT 0,
    is_free INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS exercises (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    course_id INTEGER NOT NULL REFERENCES courses(id),
    title TEXT NOT NULL,
    statement TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    initial_code TEXT NOT NULL DEFAULT '',
    position INTEGER NOT NULL
);

-- At most one row per (user, exercise)
CREATE TABLE IF NOT EXISTS exercise_progress (
    user_id INTEGER NOT NULL REFERENCES users(id),
    exercise_id INTEGER NOT NULL REFERENCES exercises(id),
    completed INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT,
    PRIMARY KEY (user_id, exercise_id)
);

CREATE TABLE IF NOT EXISTS purchases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    course_id INTEGER NOT NULL REFERENCES courses(id),
    status TEXT NOT NULL DEFAULT 'PENDING' CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED')),
    attachment_path TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    reviewed_at TEXT
);

-- Entitlements: presence means permanent access
CREATE TABLE IF NOT EXISTS user_courses (
    user_id INTEGER NOT NULL REFERENCES users(id),
    course_id INTEGER NOT NULL REFERENCES courses(id),
    unlocked_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, course_id)
);

-- Notification outbox, drained after the triggering change committed
CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    recipient TEXT NOT NULL,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    attachment_path TEXT,
    status TEXT NOT NULL DEFAULT 'PENDING',
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    sent_at TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_exercises_course ON exercises(course_id, position);
CREATE INDEX IF NOT EXISTS idx_purchases_status ON purchases(status, created_at);
CREATE INDEX IF NOT EXISTS idx_purchases_user_course ON purchases(user_id, course_id);
-- At most one purchase per (user, course) may await review
CREATE UNIQUE INDEX IF NOT EXISTS idx_purchases_one_pending
    ON purchases(user_id, course_id) WHERE status = 'PENDING';
CREATE INDEX IF NOT EXISTS idx_notifications_status ON notifications(status, created_at);
"#;
