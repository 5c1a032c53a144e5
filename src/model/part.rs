//! Body content parts (plain text, HTML, and alternative containers).

/// One multipart segment classified as textual or alternative content.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ContentPart {
    /// Lower-cased MIME type: `text/plain`, `text/html` or `multipart/alternative`.
    pub content_type: String,

    /// Boundary declared by this segment, or the one of the body it was found in.
    pub boundary: Option<String>,

    /// The `charset` parameter of `Content-Type`.
    pub charset: Option<String>,

    /// Content-Transfer-Encoding. The content is NOT decoded.
    pub transfer_encoding: Option<String>,

    /// Segment content after its local header block, read as UTF-8 or,
    /// failing that, Windows-1252. Only this segment's bytes are considered.
    pub content: String,
}

impl ContentPart {
    /// `true` for `multipart/*` containers, whose content holds nested segments.
    pub fn is_container(&self) -> bool {
        self.content_type.starts_with("multipart/")
    }
}
