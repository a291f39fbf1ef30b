mod catalog;
mod commands;
mod info;
mod init;

pub use catalog::run_catalog_import;
pub use commands::{AdminCommands, CatalogCommands};
pub use info::run_info;
pub use init::run_init;

use std::path::PathBuf;

use crate::config::ServerConfig;
use crate::store::SqliteStore;

/// Initialize store from data directory, checking it exists
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let config = ServerConfig {
        data_dir: PathBuf::from(data_dir),
        ..ServerConfig::default()
    };
    let db_path = config.db_path();

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'coursegate admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}
