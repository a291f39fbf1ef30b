use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::Notifier;
use crate::error::Result;
use crate::types::Notification;
use crate::uploads::content_type;

/// RFC 2045 line limit for base64 bodies.
const BASE64_LINE_LEN: usize = 76;

/// Drops each message as an `.eml` file into a spool directory, where a
/// local mail relay picks it up. Files are written to a temporary name and
/// renamed so the relay never sees a partial message.
pub struct SpoolNotifier {
    dir: PathBuf,
    from: String,
}

/// A file to embed in the message, read at delivery time.
struct Attachment {
    file_name: String,
    content: Vec<u8>,
}

impl SpoolNotifier {
    pub fn new(dir: impl Into<PathBuf>, from: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            from: from.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads the proof file. A file that vanished since the purchase is not a
    /// delivery failure: the message goes out without it.
    fn load_attachment(path: &str) -> Result<Option<Attachment>> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Attachment {path} is missing, sending message without it");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let file_name = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        Ok(Some(Attachment { file_name, content }))
    }

    fn render(&self, notification: &Notification) -> Result<String> {
        let attachment = match &notification.attachment_path {
            Some(path) => Self::load_attachment(path)?,
            None => None,
        };

        let mut message = String::new();
        message.push_str(&format!("From: {}\r\n", self.from));
        message.push_str(&format!("To: {}\r\n", notification.recipient));
        message.push_str(&format!("Subject: {}\r\n", notification.subject));
        message.push_str(&format!("Date: {}\r\n", notification.created_at.to_rfc2822()));
        message.push_str(&format!("Message-ID: <{}@coursegate>\r\n", notification.id));
        message.push_str("MIME-Version: 1.0\r\n");

        let body = notification.body.replace('\n', "\r\n");

        let Some(attachment) = attachment else {
            if let Some(path) = &notification.attachment_path {
                message.push_str(&format!("X-Attachment-Path: {path}\r\n"));
            }
            message.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
            message.push_str(&body);
            return Ok(message);
        };

        let boundary = format!("coursegate-{}", notification.id);
        message.push_str(&format!(
            "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"
        ));

        message.push_str(&format!("--{boundary}\r\n"));
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        message.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
        message.push_str(&body);
        message.push_str("\r\n");

        message.push_str(&format!("--{boundary}\r\n"));
        message.push_str(&format!(
            "Content-Type: {}; name=\"{}\"\r\n",
            content_type(&attachment.file_name),
            attachment.file_name
        ));
        message.push_str("Content-Transfer-Encoding: base64\r\n");
        message.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n\r\n",
            attachment.file_name
        ));

        let encoded = STANDARD.encode(&attachment.content);
        for line in encoded.as_bytes().chunks(BASE64_LINE_LEN) {
            message.push_str(&String::from_utf8_lossy(line));
            message.push_str("\r\n");
        }

        message.push_str(&format!("--{boundary}--\r\n"));
        Ok(message)
    }
}

impl Notifier for SpoolNotifier {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        let content = self.render(notification)?;
        fs::create_dir_all(&self.dir)?;

        let name = format!(
            "{}-{}.eml",
            notification.created_at.format("%Y%m%dT%H%M%S"),
            notification.id
        );
        let temp = self.dir.join(format!(".{name}.tmp"));
        fs::write(&temp, content)?;
        fs::rename(&temp, self.dir.join(&name))?;

        tracing::debug!("Spooled notification {} to {}", notification.id, self.dir.display());
        Ok(())
    }
}
