//! Directory-backed mailbox store.

pub mod mailbox;
