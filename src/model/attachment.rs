//! Attachment metadata and payload.
//!
//! The payload is kept as the bytes that appeared in the message: still
//! transfer-encoded, only trimmed of surrounding whitespace.

/// A multipart segment that was not classified as body content.
///
/// Every header-derived field is optional: a missing or malformed header
/// simply leaves the field unset.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Attachment {
    /// MIME content type (e.g. `"image/png"`), lower-cased.
    pub content_type: Option<String>,

    /// Disposition type from `Content-Disposition` (e.g. `"attachment"`, `"inline"`).
    pub content_disposition: Option<String>,

    /// The `name` parameter of `Content-Type`, with encoded-words resolved.
    pub name: Option<String>,

    /// The `filename` parameter of `Content-Disposition`, with encoded-words
    /// resolved. Falls back to [`name`](Self::name) when absent.
    pub filename: Option<String>,

    /// Content-Transfer-Encoding (`base64`, `quoted-printable`, `7bit`, ...).
    pub transfer_encoding: Option<String>,

    /// Value of the `X-Attachment-Id` header some webmail clients add.
    pub attachment_id: Option<String>,

    /// Payload bytes exactly as they appear in the message, trimmed of
    /// surrounding ASCII whitespace. Never transfer- or charset-decoded.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Best name to show for this attachment: filename, then name.
    pub fn display_name(&self) -> Option<&str> {
        self.filename.as_deref().or(self.name.as_deref())
    }
}
