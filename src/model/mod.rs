//! Core data model types: mailbox entries, content parts, and attachments.

pub mod attachment;
pub mod entry;
pub mod part;
