use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server (create database, seed the catalog and the admin account)
    Init {
        /// Data directory for the database, uploads and config file
        #[arg(long, default_value = "./data", env = "COURSEGATE_DATA_DIR")]
        data_dir: String,

        /// Email of the administrator account
        #[arg(long, env = "COURSEGATE_ADMIN_EMAIL")]
        admin_email: Option<String>,

        /// Display name of the administrator account
        #[arg(long, default_value = "Administrator")]
        admin_name: String,

        /// Password of the administrator account. Generated when omitted in
        /// non-interactive mode.
        #[arg(long, env = "COURSEGATE_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: Option<String>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Show server status information
    Info {
        /// Data directory for the database, uploads and config file
        #[arg(long, default_value = "./data", env = "COURSEGATE_DATA_DIR")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the course catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// Import courses and exercises from a YAML file
    Import {
        /// Data directory for the database, uploads and config file
        #[arg(long, default_value = "./data", env = "COURSEGATE_DATA_DIR")]
        data_dir: String,

        /// Catalog file to import
        file: PathBuf,
    },
}
