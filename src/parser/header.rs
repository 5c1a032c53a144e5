//! RFC 822 header parsing: folding, parameters, and encoded-words (RFC 2047).

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::warn;

use super::split::find_ignore_ascii_case;

/// Base64 engine for `B` encoded-words. Some mailers drop the padding.
const ENCODED_WORD_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Ordered, duplicate-preserving view of a header block.
///
/// Field names are stored lower-cased; values are the raw (unfolded, trimmed)
/// text after the colon. Lookups are case-insensitive and return values in
/// the order they appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderIndex {
    fields: Vec<(String, String)>,
}

impl HeaderIndex {
    /// Parse a raw header block.
    ///
    /// Continuation lines (starting with space or tab) are appended to the
    /// previous field. Lines that are neither a continuation nor contain a
    /// colon are skipped.
    pub fn parse(block: &str) -> Self {
        let mut fields: Vec<(String, String)> = Vec::new();

        for line in block.lines() {
            let folded = line.starts_with([' ', '\t']);
            if folded {
                let Some((_, value)) = fields.last_mut() else {
                    continue;
                };
                let more = line.trim();
                if !more.is_empty() && !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(more);
            } else if let Some((name, value)) = line.split_once(':') {
                fields.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
            }
        }

        Self { fields }
    }

    /// First value of a field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a field, in order of appearance.
    pub fn get_all(&self, name: &str) -> impl Iterator<Item = &str> + '_ {
        let name = name.to_ascii_lowercase();
        self.fields
            .iter()
            .filter(move |(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the field is present at least once.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All `(name, value)` pairs in original order, duplicates included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields, duplicates included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` when the block held no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Lower-cased MIME type of `Content-Type`, without parameters.
    pub fn content_type(&self) -> Option<String> {
        self.get("content-type")
            .map(main_value)
            .filter(|ct| !ct.is_empty())
    }

    /// The multipart boundary token, if `Content-Type` declares one.
    ///
    /// `None` means "not multipart" and is never an error.
    pub fn boundary(&self) -> Option<String> {
        self.get("content-type").and_then(|ct| param(ct, "boundary"))
    }

    /// The `charset` parameter of `Content-Type`.
    pub fn charset(&self) -> Option<String> {
        self.get("content-type").and_then(|ct| param(ct, "charset"))
    }

    /// Trimmed `Content-Transfer-Encoding`, if present and non-empty.
    pub fn transfer_encoding(&self) -> Option<String> {
        self.trimmed("content-transfer-encoding")
    }

    /// Trimmed first value of a field, `None` if missing or blank.
    pub fn trimmed(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    }
}

/// The value of a structured header before its parameters, lower-cased.
///
/// `"Text/Plain; charset=utf-8"` → `"text/plain"`. A missing `;` before the
/// first parameter is tolerated.
pub fn main_value(value: &str) -> String {
    value
        .split(|c: char| c == ';' || c.is_whitespace())
        .find(|s| !s.is_empty())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Look up a `name=value` parameter in a structured header value.
///
/// The name must stand on its own (start of text, or after `;` or
/// whitespace), so `name` never matches inside `filename`. Values may be
/// quoted with `"` or `'`; stray CRLF-tab folds are tolerated. Empty values
/// count as absent.
pub fn param(value: &str, name: &str) -> Option<String> {
    let text = value.replace("\r\n\t", " ");
    let bytes = text.as_bytes();
    let mut from = 0;

    while let Some(pos) = find_ignore_ascii_case(bytes, name.as_bytes(), from) {
        from = pos + 1;
        let standalone = pos == 0 || matches!(bytes[pos - 1], b';' | b' ' | b'\t' | b'\r' | b'\n');
        if !standalone {
            continue;
        }

        let Some(rest) = text[pos + name.len()..].trim_start().strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();

        let found = match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let inner = &rest[1..];
                inner.find(quote).map_or(inner, |end| &inner[..end])
            }
            _ => rest
                .split(|c: char| c == ';' || c.is_whitespace())
                .next()
                .unwrap_or(""),
        };

        let found = found.trim();
        if !found.is_empty() {
            return Some(found.to_string());
        }
    }

    None
}

/// Decode one region of a message (a header block or a text part) to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every
/// byte). Each region is decoded on its own, so a stray byte in one part
/// never changes how another is read.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => encoding_rs::WINDOWS_1252
            .decode_without_bom_handling(bytes)
            .0
            .into_owned(),
    }
}

/// Resolve RFC 2047 encoded-words in a header value.
///
/// `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` becomes `"Hola mundo"`.
/// Anything that is not a well-formed encoded-word is copied through, so a
/// plain value comes back unchanged. Never fails.
pub fn decode_mime_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut after_word = false;

    while let Some(pos) = rest.find("=?") {
        let (gap, candidate) = rest.split_at(pos);
        // RFC 2047 §6.2: whitespace between adjacent encoded-words is dropped
        if !(after_word && gap.trim().is_empty()) {
            out.push_str(gap);
        }

        match encoded_word(candidate) {
            Some((text, len)) => {
                out.push_str(&text);
                rest = &candidate[len..];
                after_word = true;
            }
            None => {
                out.push_str("=?");
                rest = &candidate[2..];
                after_word = false;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decode the encoded-word `=?charset?enc?text?=` at the start of `s`.
///
/// Returns the decoded text and the byte length of the whole word.
fn encoded_word(s: &str) -> Option<(String, usize)> {
    let inner = s.strip_prefix("=?")?;
    let mut fields = inner.splitn(3, '?');
    let charset = fields.next()?;
    let encoding = fields.next()?;
    let tail = fields.next()?;
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }

    let payload_len = tail.find("?=")?;
    let payload = &tail[..payload_len];
    let len = 2 + charset.len() + 1 + encoding.len() + 1 + payload_len + 2;

    let bytes = if encoding.eq_ignore_ascii_case("b") {
        ENCODED_WORD_B64.decode(payload.trim()).ok()?
    } else if encoding.eq_ignore_ascii_case("q") {
        decode_q_encoding(payload)
    } else {
        return None;
    };

    // RFC 2231 language suffix: "utf-8*en"
    let charset = charset.split_once('*').map_or(charset, |(cs, _)| cs);
    Some((decode_charset(charset, &bytes), len))
}

/// Q-encoding payload to bytes: `_` is a space, `=XX` a hex byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = match bytes[i] {
            b'=' if i + 2 < bytes.len() => hex_pair(bytes[i + 1], bytes[i + 2]),
            _ => None,
        };
        match (escaped, bytes[i]) {
            (Some(byte), _) => {
                out.push(byte);
                i += 3;
                continue;
            }
            (None, b'_') => out.push(b' '),
            (None, b) => out.push(b),
        }
        i += 1;
    }
    out
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// Bytes in a named charset to text. Unknown labels are read as lossy UTF-8.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    match encoding_rs::Encoding::for_label(charset.trim().as_bytes()) {
        Some(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
        None => {
            warn!(charset, "Unknown charset in encoded-word, reading as UTF-8");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order_and_duplicates() {
        let block = "Received: from a\r\nSubject: Hi\r\nReceived: from b\r\n";
        let headers = HeaderIndex::parse(block);
        assert_eq!(headers.len(), 3);
        let received: Vec<&str> = headers.get_all("Received").collect();
        assert_eq!(received, vec!["from a", "from b"]);
        let names: Vec<&str> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["received", "subject", "received"]);
    }

    #[test]
    fn test_lookup_with_short_lived_name() {
        let headers = HeaderIndex::parse("X-Mailer: test\r\nx-mailer: again\r\n");
        let value = {
            let name = String::from("X-MAILER");
            headers.get(&name)
        };
        assert_eq!(value, Some("test"));

        let all: Vec<&str> = {
            let name = String::from("X-Mailer");
            headers.get_all(&name).collect()
        };
        assert_eq!(all, vec!["test", "again"]);
    }

    #[test]
    fn test_parse_continuation_lines() {
        let block = "Subject: This is a long\r\n\tsubject line\r\nFrom: user@example.com\r\n";
        let headers = HeaderIndex::parse(block);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("subject"), Some("This is a long subject line"));
    }

    #[test]
    fn test_parse_skips_garbage_lines() {
        let headers = HeaderIndex::parse("not a header\nX-Ok: yes\n");
        assert_eq!(headers.len(), 1);
        assert!(headers.contains("x-ok"));
        assert!(!headers.contains("not a header"));
    }

    #[test]
    fn test_boundary_quoted_and_bare() {
        let quoted = HeaderIndex::parse("Content-Type: multipart/mixed; boundary=\"abc-123\"\n");
        assert_eq!(quoted.boundary().as_deref(), Some("abc-123"));

        let bare = HeaderIndex::parse("Content-Type: multipart/mixed; BOUNDARY=xyz\n");
        assert_eq!(bare.boundary().as_deref(), Some("xyz"));

        let single = HeaderIndex::parse("Content-Type: multipart/mixed; boundary='q.1'\n");
        assert_eq!(single.boundary().as_deref(), Some("q.1"));
    }

    #[test]
    fn test_boundary_folded_parameter() {
        let block = "Content-Type: multipart/alternative;\r\n\tboundary=\"==alt==\"\r\n";
        let headers = HeaderIndex::parse(block);
        assert_eq!(headers.content_type().as_deref(), Some("multipart/alternative"));
        assert_eq!(headers.boundary().as_deref(), Some("==alt=="));
    }

    #[test]
    fn test_boundary_absent() {
        let headers = HeaderIndex::parse("Content-Type: text/plain; charset=us-ascii\n");
        assert_eq!(headers.boundary(), None);
        assert_eq!(headers.charset().as_deref(), Some("us-ascii"));
        assert_eq!(HeaderIndex::parse("Subject: x\n").boundary(), None);
    }

    #[test]
    fn test_param_name_not_matched_inside_filename() {
        let value = "attachment; filename=\"report.pdf\"";
        assert_eq!(param(value, "name"), None);
        assert_eq!(param(value, "filename").as_deref(), Some("report.pdf"));
    }

    #[test]
    fn test_param_raw_crlf_tab() {
        let value = "multipart/mixed;\r\n\tboundary=\"b1\"";
        assert_eq!(param(value, "boundary").as_deref(), Some("b1"));
    }

    #[test]
    fn test_main_value() {
        assert_eq!(main_value("Text/HTML; charset=utf-8"), "text/html");
        assert_eq!(main_value("  image/png"), "image/png");
        assert_eq!(main_value("multipart/mixed boundary=x"), "multipart/mixed");
        assert_eq!(main_value(""), "");
    }

    #[test]
    fn test_decode_base64_encoded_word() {
        let input = "=?UTF-8?B?SG9sYSBtdW5kbw==?=";
        assert_eq!(decode_mime_string(input), "Hola mundo");
    }

    #[test]
    fn test_decode_base64_without_padding() {
        assert_eq!(decode_mime_string("=?UTF-8?B?SG9sYQ?="), "Hola");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        let input = "=?ISO-8859-1?Q?caf=E9?=";
        assert_eq!(decode_mime_string(input), "café");
    }

    #[test]
    fn test_decode_multiple_encoded_words() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_mime_string(input), "Hola mundo");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= there";
        assert_eq!(decode_mime_string(input), "Re: Hola there");
    }

    #[test]
    fn test_decode_plain_text_unchanged() {
        assert_eq!(decode_mime_string("photo.png"), "photo.png");
        assert_eq!(decode_mime_string("a =? b"), "a =? b");
        assert_eq!(decode_mime_string("=?UTF-8?X?abc?="), "=?UTF-8?X?abc?=");
        assert_eq!(decode_mime_string(""), "");
    }

    #[test]
    fn test_decode_iso8859_encoded_word() {
        let input = "=?ISO-8859-1?Q?R=E9sum=E9_du_projet?=";
        assert_eq!(decode_mime_string(input), "Résumé du projet");
    }

    #[test]
    fn test_decode_utf8_base64_japanese() {
        // 山田太郎
        let input = "=?UTF-8?B?5bGx55Sw5aSq6YOO?=";
        assert_eq!(decode_mime_string(input), "山田太郎");
    }

    #[test]
    fn test_decode_windows1252_encoded_word() {
        let input = "=?Windows-1252?Q?M=FCller?=";
        assert_eq!(decode_mime_string(input), "Müller");
    }

    #[test]
    fn test_decode_text_falls_back_to_windows_1252() {
        assert_eq!(decode_text(b"caf\xe9"), "café");
        assert_eq!(decode_text("café".as_bytes()), "café");
        assert_eq!(decode_text(b"\xEF\xBB\xBFSubject: x"), "Subject: x");
    }
}
