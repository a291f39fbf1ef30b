use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::AuthSettings;
use crate::error::{Error, Result};
use crate::notify::NoticeSettings;

pub const CONFIG_FILE_NAME: &str = "coursegate.toml";
const DB_FILE_NAME: &str = "coursegate.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Receives purchase alerts. Accounts registered with this exact email
    /// are created as admins.
    pub admin_email: String,
    /// PIX key buyers pay to, echoed in purchase alerts.
    pub pix_key: String,
    pub product_name: String,
    pub token_ttl_days: i64,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from: String,
    /// Directory to drop `.eml` files into. Messages are only logged when unset.
    pub spool_dir: Option<PathBuf>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "Coursegate <no-reply@coursegate.local>".to_string(),
            spool_dir: None,
        }
    }
}

impl ServerConfig {
    /// Reads a TOML config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Reads `path` if it exists, otherwise starts from the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.admin_email.contains('@') {
            return Err(Error::Config(format!(
                "admin_email '{}' is not an email address",
                self.admin_email
            )));
        }
        if self.token_ttl_days < 1 {
            return Err(Error::Config("token_ttl_days must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    #[must_use]
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    #[must_use]
    pub fn default_config_path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE_NAME)
    }

    #[must_use]
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            admin_email: self.admin_email.clone(),
            token_ttl: chrono::Duration::days(self.token_ttl_days),
        }
    }

    #[must_use]
    pub fn notice_settings(&self) -> NoticeSettings {
        NoticeSettings {
            admin_email: self.admin_email.clone(),
            pix_key: self.pix_key.clone(),
            product_name: self.product_name.clone(),
            uploads_dir: self.uploads_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            data_dir: PathBuf::from("./data"),
            admin_email: "admin@coursegate.local".to_string(),
            pix_key: "change-me".to_string(),
            product_name: "Coursegate".to_string(),
            token_ttl_days: 7,
            mail: MailConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
admin_email = "owner@example.com"
pix_key = "pix@example.com"

[mail]
spool_dir = "/var/spool/coursegate"
"#,
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.admin_email, "owner@example.com");
        assert_eq!(config.port, 4000);
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.mail.spool_dir, Some(PathBuf::from("/var/spool/coursegate")));
        assert!(config.mail.from.contains("no-reply"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig::load_or_default(&temp.path().join("nope.toml")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "port = \"eighty\"").unwrap();

        assert!(matches!(ServerConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.token_ttl_days = 0;
        assert!(config.validate().is_err());

        config.token_ttl_days = 7;
        config.admin_email = "nobody".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_paths() {
        let config = ServerConfig {
            data_dir: PathBuf::from("/srv/cg"),
            ..ServerConfig::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/srv/cg/coursegate.db"));
        assert_eq!(config.notice_settings().uploads_dir, PathBuf::from("/srv/cg/uploads"));
        assert_eq!(config.auth_settings().token_ttl, chrono::Duration::days(7));
    }
}
