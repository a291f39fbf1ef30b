//! # Coursegate
//!
//! A course-delivery backend: accounts, a course catalog with free and paid
//! courses, per-exercise progress, and a manual payment-proof workflow that
//! unlocks paid courses once an administrator approves the purchase. Usable
//! both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! coursegate = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coursegate::config::ServerConfig;
//! use coursegate::notify::{LogNotifier, Outbox};
//! use coursegate::server::{AppState, create_router};
//! use coursegate::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store: Arc<dyn Store> = Arc::new(SqliteStore::new(&config.db_path()).unwrap());
//! store.initialize().unwrap();
//!
//! let outbox = Arc::new(Outbox::new(
//!     store.clone(),
//!     Arc::new(LogNotifier),
//!     config.notice_settings(),
//! ));
//! let state = Arc::new(AppState::new(store, outbox, &config));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod notify;
pub mod server;
pub mod store;
pub mod types;
pub mod uploads;
