//! Offset-based splitting of messages and multipart bodies.
//!
//! Everything here works on raw bytes and scans them directly instead of
//! using patterns, so large attachment payloads are walked once, never
//! trigger backtracking, and are never re-encoded.

/// Find `needle` in `haystack` starting at `from`, ignoring ASCII case.
///
/// Positions returned for UTF-8 input always fall on char boundaries as long
/// as `needle` starts with an ASCII byte.
pub(crate) fn find_ignore_ascii_case(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    let first = needle[0].to_ascii_lowercase();
    let last_start = haystack.len() - needle.len();

    (from..=last_start).find(|&i| {
        haystack[i].to_ascii_lowercase() == first
            && haystack[i..i + needle.len()].eq_ignore_ascii_case(needle)
    })
}

/// Locate the first blank line: returns `(header_end, body_start)`.
///
/// Accepts `\r\n\r\n` or `\n\n`, whichever comes first.
pub(crate) fn header_bounds_strict(data: &[u8]) -> Option<(usize, usize)> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some((i, i + 2));
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some((i, i + 4));
        }
    }
    None
}

/// Locate the first run of line-break characters that separates a header
/// block from its content: 3 or more CR/LF in a row, or any run holding two
/// LFs. Returns `(header_end, content_start)`.
pub(crate) fn header_bounds_loose(data: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < data.len() {
        if !is_line_break(data[i]) {
            i += 1;
            continue;
        }
        let start = i;
        let mut newlines = 0;
        while i < data.len() && is_line_break(data[i]) {
            if data[i] == b'\n' {
                newlines += 1;
            }
            i += 1;
        }
        if i - start >= 3 || newlines >= 2 {
            return Some((start, i));
        }
    }
    None
}

fn is_line_break(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}

/// Split a whole message at its first blank line.
///
/// Without a blank line the entire region is the header and the content is empty.
pub fn split_header_body_strict(region: &[u8]) -> (&[u8], &[u8]) {
    match header_bounds_strict(region) {
        Some((end, start)) => (&region[..end], &region[start..]),
        None => (region, &[][..]),
    }
}

/// Split a multipart segment into its local header block and content.
///
/// Uses the tolerant delimiter from [`header_bounds_loose`]. Without one the
/// entire region is the header and the content is empty.
pub fn split_header_body(region: &[u8]) -> (&[u8], &[u8]) {
    match header_bounds_loose(region) {
        Some((end, start)) => (&region[..end], &region[start..]),
        None => (region, &[][..]),
    }
}

/// Split a multipart body into the segments between `--boundary` delimiters.
///
/// - The boundary is matched ASCII case-insensitively, and only when followed
///   by `--`, whitespace, or the end of the body.
/// - Text before the first delimiter is dropped, and so is everything after
///   a closing `--boundary--`.
/// - Segments are trimmed; empty ones are dropped.
pub fn split_by_boundary<'a>(region: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let mut segments = Vec::new();
    if boundary.is_empty() {
        return segments;
    }

    let delimiter = format!("--{boundary}");
    let mut segment_start: Option<usize> = None;
    let mut from = 0;

    while let Some((pos, closing)) = find_delimiter(region, &delimiter, from) {
        let after = pos + delimiter.len();
        if let Some(start) = segment_start {
            push_segment(&mut segments, &region[start..pos]);
        }
        if closing {
            return segments;
        }
        segment_start = Some(after);
        from = after;
    }

    if let Some(start) = segment_start {
        push_segment(&mut segments, &region[start..]);
    }
    segments
}

/// Find the next `--boundary` delimiter at or after `from`.
///
/// Returns its offset and whether it is the closing `--boundary--`. A match
/// only counts when followed by `--`, whitespace, or the end of `bytes`.
pub(crate) fn find_delimiter(bytes: &[u8], delimiter: &str, mut from: usize) -> Option<(usize, bool)> {
    while let Some(pos) = find_ignore_ascii_case(bytes, delimiter.as_bytes(), from) {
        let after = pos + delimiter.len();
        let closing = bytes[after..].starts_with(b"--");
        if closing || after == bytes.len() || bytes[after].is_ascii_whitespace() {
            return Some((pos, closing));
        }
        from = pos + 1;
    }
    None
}

fn push_segment<'a>(segments: &mut Vec<&'a [u8]>, segment: &'a [u8]) {
    let segment = segment.trim_ascii();
    if !segment.is_empty() {
        segments.push(segment);
    }
}
