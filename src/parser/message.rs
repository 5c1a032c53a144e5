//! Message decomposition: raw bytes → header, content parts, attachments.
//!
//! Parsing is eager and tolerant. A message always decomposes; segments that
//! cannot be classified are skipped and missing headers leave fields unset.
//!
//! Layout handled:
//! - top-level multipart body split by the message boundary;
//! - `text/plain`, `text/html` and `multipart/alternative` segments become
//!   [`ContentPart`]s, an alternative's children being appended as siblings
//!   right after their container;
//! - any other segment becomes an [`Attachment`] with its payload untouched.

use std::path::Path;

use tracing::debug;

use crate::error::{MailboxError, Result};
use crate::model::attachment::Attachment;
use crate::model::part::ContentPart;
use crate::parser::header::{self, decode_mime_string, decode_text, HeaderIndex};
use crate::parser::split::{split_by_boundary, split_header_body, split_header_body_strict};

pub const MULTIPART_ALTERNATIVE: &str = "multipart/alternative";
pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";

/// Whether a segment of this type is body content rather than an attachment.
pub fn is_body_content(content_type: &str) -> bool {
    matches!(content_type, MULTIPART_ALTERNATIVE | TEXT_HTML | TEXT_PLAIN)
}

/// A fully decomposed message. Immutable once built.
#[derive(Debug, Clone)]
pub struct Message {
    id: Option<usize>,
    raw: Vec<u8>,
    header_text: String,
    body_start: usize,
    header: HeaderIndex,
    parts: Vec<ContentPart>,
    attachments: Vec<Attachment>,
}

impl Message {
    /// Decompose a raw message. `id` is an optional caller-assigned number.
    pub fn parse(raw: impl Into<Vec<u8>>, id: Option<usize>) -> Self {
        let raw = raw.into();
        let (header_block, body) = split_header_body_strict(&raw);
        let body_start = raw.len() - body.len();
        let header_text = decode_text(header_block);
        let header = HeaderIndex::parse(&header_text);

        let mut decomposer = Decomposer::default();
        match header.boundary() {
            Some(boundary) => decomposer.multipart(body, &boundary),
            None => decomposer.single_part(&header, body),
        }

        debug!(
            id = ?id,
            parts = decomposer.parts.len(),
            attachments = decomposer.attachments.len(),
            "Decomposed message"
        );

        Self {
            id,
            raw,
            header_text,
            body_start,
            header,
            parts: decomposer.parts,
            attachments: decomposer.attachments,
        }
    }

    /// Read and decompose a message file.
    pub fn from_file(path: impl AsRef<Path>, id: Option<usize>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| MailboxError::io(path, e))?;
        Ok(Self::parse(raw, id))
    }

    /// Write the original bytes to `path`, returning the number of bytes written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        std::fs::write(path, &self.raw).map_err(|e| MailboxError::io(path, e))?;
        Ok(self.raw.len())
    }

    /// Caller-assigned number, if any.
    pub fn id(&self) -> Option<usize> {
        self.id
    }

    /// Parsed top-level header fields.
    pub fn header(&self) -> &HeaderIndex {
        &self.header
    }

    /// Header block as text, without the blank line that ends it.
    pub fn header_block(&self) -> &str {
        &self.header_text
    }

    /// Raw bytes after the header block's blank line.
    pub fn body(&self) -> &[u8] {
        &self.raw[self.body_start..]
    }

    /// Body content parts, in the order they appear in the message.
    pub fn parts(&self) -> &[ContentPart] {
        &self.parts
    }

    /// Attachments, in the order they appear in the message.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// The original, unmodified bytes.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Decoded `Subject`.
    pub fn subject(&self) -> Option<String> {
        self.header.get("subject").map(decode_mime_string)
    }

    /// Decoded `From`.
    pub fn sender(&self) -> Option<String> {
        self.header.get("from").map(decode_mime_string)
    }
}

#[derive(Default)]
struct Decomposer {
    parts: Vec<ContentPart>,
    attachments: Vec<Attachment>,
}

impl Decomposer {
    fn multipart(&mut self, body: &[u8], boundary: &str) {
        for segment in split_by_boundary(body, boundary) {
            let (local, content) = split_header_body(segment);
            let local = HeaderIndex::parse(&decode_text(local));

            let Some(content_type) = local.content_type() else {
                debug!(boundary, "Skipping segment without Content-Type");
                continue;
            };

            if is_body_content(&content_type) {
                self.body_content(&local, content, content_type, Some(boundary));
            } else {
                self.attachments.push(build_attachment(&local, content));
            }
        }
    }

    /// A message without a boundary carries exactly one part.
    fn single_part(&mut self, header: &HeaderIndex, body: &[u8]) {
        // RFC 2045 §5.2: no Content-Type means text/plain
        let content_type = header
            .content_type()
            .unwrap_or_else(|| TEXT_PLAIN.to_string());

        if is_body_content(&content_type) {
            self.body_content(header, body, content_type, None);
        } else {
            self.attachments.push(build_attachment(header, body));
        }
    }

    fn body_content(
        &mut self,
        local: &HeaderIndex,
        content: &[u8],
        content_type: String,
        parent_boundary: Option<&str>,
    ) {
        let boundary = local
            .boundary()
            .or_else(|| parent_boundary.map(String::from));
        let is_alternative = content_type == MULTIPART_ALTERNATIVE;

        self.parts.push(ContentPart {
            content_type,
            boundary: boundary.clone(),
            charset: local.charset(),
            transfer_encoding: local.transfer_encoding(),
            content: decode_text(content),
        });

        let Some(boundary) = boundary.filter(|_| is_alternative) else {
            return;
        };

        // Renderings of an alternative are flattened right after it.
        for sub in split_by_boundary(content, &boundary) {
            let (sub_header, sub_content) = split_header_body(sub);
            let sub_header = HeaderIndex::parse(&decode_text(sub_header));
            let Some(sub_type) = sub_header.content_type() else {
                debug!(boundary = %boundary, "Skipping alternative without Content-Type");
                continue;
            };

            self.parts.push(ContentPart {
                content_type: sub_type,
                boundary: Some(boundary.clone()),
                charset: sub_header.charset(),
                transfer_encoding: sub_header.transfer_encoding(),
                content: decode_text(sub_content),
            });
        }
    }
}

fn build_attachment(local: &HeaderIndex, content: &[u8]) -> Attachment {
    let content_type_raw = local.get("content-type");
    let disposition_raw = local.get("content-disposition");

    let name = content_type_raw
        .and_then(|v| header::param(v, "name"))
        .map(|n| decoded_or_raw(&n));
    let filename = disposition_raw
        .and_then(|v| header::param(v, "filename"))
        .map(|n| decoded_or_raw(&n))
        .or_else(|| name.clone());

    Attachment {
        content_type: local.content_type(),
        content_disposition: disposition_raw
            .map(header::main_value)
            .filter(|d| !d.is_empty()),
        name,
        filename,
        transfer_encoding: local.transfer_encoding(),
        attachment_id: local.trimmed("x-attachment-id"),
        data: content.trim_ascii().to_vec(),
    }
}

/// Decoded parameter value, or the raw one when decoding leaves nothing.
fn decoded_or_raw(raw: &str) -> String {
    let decoded = decode_mime_string(raw);
    if decoded.trim().is_empty() {
        raw.to_string()
    } else {
        decoded
    }
}
