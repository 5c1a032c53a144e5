//! Integration tests for MIME decomposition of fixture messages.

use std::path::Path;

use emlbox::parser::header::decode_mime_string;
use emlbox::parser::message::Message;

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

// ─── Single-part text/plain → one part, no attachments ──────────────

#[test]
fn test_single_part_plain_message() {
    let msg = Message::from_file(fixture("plain.eml"), Some(1)).unwrap();
    assert_eq!(msg.id(), Some(1));
    assert_eq!(msg.header().boundary(), None);

    assert_eq!(msg.parts().len(), 1);
    let part = &msg.parts()[0];
    assert_eq!(part.content_type, "text/plain");
    assert_eq!(part.charset.as_deref(), Some("us-ascii"));
    assert_eq!(part.transfer_encoding.as_deref(), Some("7bit"));
    assert!(part.content.starts_with("Hi Bob,"));
    assert!(part.content.contains("lunch on Friday"));

    assert!(msg.attachments().is_empty());
    assert_eq!(msg.subject().as_deref(), Some("Lunch on Friday?"));
}

// ─── Encoded attachment name is decoded ─────────────────────────────

#[test]
fn test_attachment_name_is_mime_decoded() {
    let msg = Message::from_file(fixture("photo.eml"), None).unwrap();
    assert_eq!(
        msg.header().boundary().as_deref(),
        Some("----=_Part_42_1700000000")
    );

    assert_eq!(msg.attachments().len(), 1);
    let att = &msg.attachments()[0];
    assert_eq!(att.content_type.as_deref(), Some("image/png"));
    assert_eq!(att.name.as_deref(), Some("photo.png"));
    // No filename parameter in Content-Disposition: falls back to name
    assert_eq!(att.filename.as_deref(), Some("photo.png"));
    assert_eq!(att.content_disposition.as_deref(), Some("attachment"));
    assert_eq!(att.transfer_encoding.as_deref(), Some("base64"));
    assert_eq!(att.attachment_id.as_deref(), Some("f_lq2x9k0a0"));
    // Payload stays encoded
    assert!(att.data.starts_with(b"iVBORw0KGgo"));
    assert!(att.data.ends_with(b"RU5ErkJggg=="));

    assert_eq!(msg.parts().len(), 1);
    assert_eq!(msg.parts()[0].content_type, "text/plain");
    assert_eq!(msg.parts()[0].content, "Here is the photo from the beach.");
    assert_eq!(msg.subject().as_deref(), Some("Vacation photo 🏖"));
}

// ─── Nested multipart/alternative → container, plain, html ──────────

#[test]
fn test_nested_alternative_part_order() {
    let msg = Message::from_file(fixture("alternative.eml"), None).unwrap();

    let types: Vec<&str> = msg.parts().iter().map(|p| p.content_type.as_str()).collect();
    assert_eq!(
        types,
        vec!["multipart/alternative", "text/plain", "text/html"]
    );

    let container = &msg.parts()[0];
    assert!(container.is_container());
    assert_eq!(container.boundary.as_deref(), Some("alt-inner"));

    let plain = &msg.parts()[1];
    assert_eq!(plain.boundary.as_deref(), Some("alt-inner"));
    assert_eq!(plain.charset.as_deref(), Some("utf-8"));
    assert_eq!(plain.transfer_encoding.as_deref(), Some("7bit"));
    assert_eq!(plain.content, "The report is attached.");

    let html = &msg.parts()[2];
    assert_eq!(html.transfer_encoding.as_deref(), Some("quoted-printable"));
    assert_eq!(html.content, "<p>The report is <b>attached</b>.</p>");

    assert_eq!(msg.attachments().len(), 1);
    let att = &msg.attachments()[0];
    assert_eq!(att.name.as_deref(), Some("report.pdf"));
    assert_eq!(att.filename.as_deref(), Some("Q3 résumé.pdf"));
    assert_eq!(msg.sender().as_deref(), Some("José García <jose@example.com>"));
}

// ─── Raw storage round trip ─────────────────────────────────────────

#[test]
fn test_save_to_file_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let original = Message::from_file(fixture("alternative.eml"), None).unwrap();

    let copy_path = tmp.path().join("copy.eml");
    let written = original.save_to_file(&copy_path).unwrap();
    assert_eq!(written, original.raw().len());
    assert_eq!(std::fs::read(&copy_path).unwrap(), original.raw());

    let reopened = Message::from_file(&copy_path, None).unwrap();
    assert_eq!(reopened.header_block(), original.header_block());
    assert_eq!(reopened.body(), original.body());
    assert_eq!(reopened.header(), original.header());
    assert_eq!(reopened.parts(), original.parts());
    assert_eq!(reopened.attachments(), original.attachments());
}

#[test]
fn test_save_to_missing_directory_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let msg = Message::from_file(fixture("plain.eml"), None).unwrap();
    let result = msg.save_to_file(tmp.path().join("missing").join("x.eml"));
    assert!(result.is_err());
}

#[test]
fn test_from_file_missing() {
    assert!(Message::from_file(fixture("does-not-exist.eml"), None).is_err());
}

// ─── Tolerance for malformed input ──────────────────────────────────

#[test]
fn test_lf_only_message_decomposes() {
    let raw = "Subject: lf\nContent-Type: multipart/mixed; boundary=b\n\n\
--b\nContent-Type: text/plain\n\nhello\n\
--b\nContent-Type: application/octet-stream; name=x.bin\n\nAAAA\n--b--\n";
    let msg = Message::parse(raw, None);
    assert_eq!(msg.parts().len(), 1);
    assert_eq!(msg.parts()[0].content, "hello");
    assert_eq!(msg.attachments().len(), 1);
    assert_eq!(msg.attachments()[0].data, b"AAAA");
}

#[test]
fn test_boundary_without_delimiters_yields_nothing() {
    let raw = "Content-Type: multipart/mixed; boundary=nowhere\r\n\r\njust text\r\n";
    let msg = Message::parse(raw, None);
    assert!(msg.parts().is_empty());
    assert!(msg.attachments().is_empty());
    assert_eq!(msg.body(), b"just text\r\n");
}

#[test]
fn test_undecodable_name_is_kept_raw() {
    let raw = "Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\nContent-Type: text/csv; name=\"=?UTF-8?B??=\"\r\n\r\na,b\r\n--b--";
    let msg = Message::parse(raw, None);
    assert_eq!(decode_mime_string("=?UTF-8?B??="), "");
    assert_eq!(msg.attachments()[0].name.as_deref(), Some("=?UTF-8?B??="));
}

#[test]
fn test_eight_bit_attachment_bytes_survive() {
    let mut raw = std::fs::read(fixture("alternative.eml")).unwrap();
    // Replace the PDF payload with raw Latin-1 and control bytes
    let payload = b"JVBERi0xLjQKJcfsj6IKNSAwIG9iago8PC9MZW5ndGggNiAwIFI+PgpzdHJlYW0K";
    let at = raw.windows(payload.len()).position(|w| w == payload).unwrap();
    raw.splice(at..at + payload.len(), b"%PDF\x00\xe9\xff".iter().copied());

    let msg = Message::parse(raw, None);
    assert_eq!(msg.attachments()[0].data, b"%PDF\x00\xe9\xff");
    assert_eq!(msg.parts()[1].content, "The report is attached.");
    assert_eq!(msg.sender().as_deref(), Some("José García <jose@example.com>"));
}
