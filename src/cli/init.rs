use std::fs;
use std::path::{Path, PathBuf};

use inquire::{Password, PasswordDisplayMode, Text};

use crate::auth::{MIN_PASSWORD_LEN, accounts, generate_password};
use crate::config::ServerConfig;
use crate::store::{SqliteStore, Store, seed};
use crate::types::Role;

pub fn run_init(
    data_dir: String,
    admin_email: Option<String>,
    admin_name: String,
    admin_password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let data_path = PathBuf::from(&data_dir);
    fs::create_dir_all(&data_path)?;

    let config_path = ServerConfig::default_config_path(&data_path);
    let mut config = ServerConfig::load_or_default(&config_path)?;
    config.data_dir = data_path.clone();

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    if store.has_admin_user()? {
        anyhow::bail!(
            "Server already initialized. Database exists at: {}",
            config.db_path().display()
        );
    }

    let email = resolve_admin_email(&config_path, &config, admin_email, non_interactive)?;
    if email != config.admin_email || !config_path.exists() {
        config.admin_email = email.clone();
        config.validate()?;
        write_config(&config_path, &config)?;
    }

    if let Some(summary) = seed::seed_default_catalog(&store)? {
        println!(
            "Seeded catalog with {} courses and {} exercises",
            summary.courses, summary.exercises
        );
    }

    let (password, generated) = match admin_password {
        Some(password) => (password, false),
        None if non_interactive => (generate_password(), true),
        None => (prompt_password()?, false),
    };

    let admin = accounts::create_user(&store, &admin_name, &email, &password, Role::Admin)?;

    println!();
    println!("========================================");
    println!("Admin account: {}", admin.email);
    if generated {
        println!("Generated password (save this, it won't be shown again):");
        println!();
        println!("  {password}");
        println!();
    }
    println!("Config written to: {}", config_path.display());
    println!("========================================");
    println!();

    Ok(())
}

fn resolve_admin_email(
    config_path: &Path,
    config: &ServerConfig,
    flag: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<String> {
    if let Some(email) = flag {
        if config_path.exists() && email != config.admin_email {
            anyhow::bail!(
                "--admin-email '{email}' does not match admin_email '{}' in {}",
                config.admin_email,
                config_path.display()
            );
        }
        return Ok(email);
    }

    if config_path.exists() {
        return Ok(config.admin_email.clone());
    }

    if non_interactive {
        anyhow::bail!("--admin-email is required in non-interactive mode");
    }

    let email = Text::new("Admin email:")
        .with_validator(|input: &str| {
            if input.contains('@') && !input.contains(char::is_whitespace) {
                Ok(inquire::validator::Validation::Valid)
            } else {
                Ok(inquire::validator::Validation::Invalid(
                    "Enter a valid email address".into(),
                ))
            }
        })
        .prompt()?;

    Ok(email)
}

fn prompt_password() -> anyhow::Result<String> {
    let password = Password::new("Admin password:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_validator(|input: &str| {
            if input.chars().count() >= MIN_PASSWORD_LEN {
                Ok(inquire::validator::Validation::Valid)
            } else {
                Ok(inquire::validator::Validation::Invalid(
                    format!("Password must be at least {MIN_PASSWORD_LEN} characters").into(),
                ))
            }
        })
        .prompt()?;

    Ok(password)
}

fn write_config(path: &Path, config: &ServerConfig) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
