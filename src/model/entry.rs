//! Mailbox entries: one per tracked message file.

/// A message file tracked by a [`MailboxStore`](crate::store::mailbox::MailboxStore).
///
/// Entries are never dropped from the store's list. A pending deletion only
/// removes the backing file, and only when the store is closed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MailboxEntry {
    /// File name relative to the mailbox directory.
    pub file_name: String,

    /// Whether the file will be deleted when the store closes.
    pub pending_delete: bool,
}

impl MailboxEntry {
    /// A freshly scanned entry, not marked for deletion.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            pending_delete: false,
        }
    }
}
