mod storage;

pub use storage::{AttachmentError, AttachmentStorage, MAX_ATTACHMENT_SIZE, content_type};
