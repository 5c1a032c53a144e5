//! Message parsing: header indexing, segment splitting, and MIME decomposition.

pub mod header;
pub mod message;
pub mod split;
