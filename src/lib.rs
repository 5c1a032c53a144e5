//! `emlbox`: a directory of `.eml` files treated as a mailbox.
//!
//! This crate provides the mailbox store (listing, retrieval, deferred
//! deletion) and a tolerant MIME decomposer that splits a raw message into
//! body content parts and attachments.

pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod store;
