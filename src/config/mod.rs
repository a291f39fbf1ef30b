mod server;

pub use server::{CONFIG_FILE_NAME, MailConfig, ServerConfig};
