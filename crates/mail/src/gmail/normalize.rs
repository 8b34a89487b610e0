//! Gmail payload flattening
//!
//! Walks the MIME tree of a Gmail message and collects every `text/plain`
//! and `text/html` leaf plus attachment metadata into a [`ParsedMessage`].
//! Parsing never fails: a leaf that cannot be decoded contributes nothing.

use base64::prelude::*;

use super::api::{GmailMessage, MessagePayload};
use crate::models::{Attachment, MessageId, ParsedMessage, ThreadId};

/// Text buffers and attachments gathered from one payload tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBody {
    pub text_plain: String,
    pub text_html: String,
    pub attachments: Vec<Attachment>,
}

/// Body data that could not be decoded as base64
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("body data is not valid base64")]
pub struct DecodeError;

/// Flatten a Gmail API message into a [`ParsedMessage`]
pub fn parse_message(gmail_msg: &GmailMessage) -> ParsedMessage {
    let (headers, body) = match &gmail_msg.payload {
        Some(payload) => (
            payload.headers.clone().unwrap_or_default(),
            parse_payload(payload),
        ),
        None => (Vec::new(), ParsedBody::default()),
    };

    ParsedMessage {
        id: MessageId::new(&gmail_msg.id),
        thread_id: gmail_msg.thread_id.as_deref().map(ThreadId::new),
        snippet: gmail_msg.snippet.clone(),
        headers,
        text_plain: body.text_plain,
        text_html: body.text_html,
        attachments: body.attachments,
    }
}

/// Flatten a payload tree into text/HTML buffers and attachment metadata
///
/// Both buffers are trimmed once, after the whole tree has been walked.
pub fn parse_payload(payload: &MessagePayload) -> ParsedBody {
    let mut out = ParsedBody::default();
    walk_part(payload, &mut out);
    out.text_plain = out.text_plain.trim().to_string();
    out.text_html = out.text_html.trim().to_string();
    out
}

/// Visit one node: its own body, its attachment-ness, then its children in order
fn walk_part(part: &MessagePayload, out: &mut ParsedBody) {
    let mime = part
        .mime_type
        .as_deref()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if mime.starts_with("text/")
        && let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref())
        && !data.is_empty()
    {
        if mime.starts_with("text/plain") {
            out.text_plain
                .push_str(&decode_base64_body(data).unwrap_or_default());
        } else if mime.starts_with("text/html") {
            out.text_html
                .push_str(&decode_base64_body(data).unwrap_or_default());
        }
    }

    if let Some(filename) = part.filename.as_deref()
        && !filename.is_empty()
    {
        let body = part.body.as_ref();
        out.attachments.push(Attachment {
            filename: filename.to_string(),
            mime_type: part.mime_type.clone().unwrap_or_default(),
            size: body.and_then(|b| b.size).unwrap_or(0),
            attachment_id: body.and_then(|b| b.attachment_id.clone()),
        });
    }

    for child in part.parts.iter().flatten() {
        walk_part(child, out);
    }
}

/// Decode base64-encoded body data
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple
/// decoders. Bytes that are not valid UTF-8 are dropped.
pub fn decode_base64_body(data: &str) -> Result<String, DecodeError> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    let bytes = decoders
        .iter()
        .find_map(|decoder| decoder.decode(data.trim()).ok())
        .ok_or(DecodeError)?;

    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::{Header, MessageBody};

    fn b64(s: &str) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(s)
    }

    fn leaf(mime: &str, text: &str) -> MessagePayload {
        MessagePayload {
            mime_type: Some(mime.to_string()),
            body: Some(MessageBody {
                size: Some(text.len() as u64),
                data: Some(b64(text)),
                attachment_id: None,
            }),
            ..Default::default()
        }
    }

    fn container(mime: &str, parts: Vec<MessagePayload>) -> MessagePayload {
        MessagePayload {
            mime_type: Some(mime.to_string()),
            body: Some(MessageBody::default()),
            parts: Some(parts),
            ..Default::default()
        }
    }

    fn attachment(filename: &str, mime: &str) -> MessagePayload {
        MessagePayload {
            mime_type: Some(mime.to_string()),
            filename: Some(filename.to_string()),
            body: Some(MessageBody {
                size: Some(2048),
                data: None,
                attachment_id: Some("att-1".to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_flat_plain_and_html() {
        let payload = container(
            "multipart/alternative",
            vec![leaf("text/plain", "A"), leaf("text/html", "<b>B</b>")],
        );
        let parsed = parse_payload(&payload);
        assert_eq!(parsed.text_plain, "A");
        assert_eq!(parsed.text_html, "<b>B</b>");
        assert!(parsed.attachments.is_empty());
    }

    #[test]
    fn test_nested_parts_concatenate_in_order() {
        let payload = container(
            "multipart/mixed",
            vec![
                leaf("text/plain", "A"),
                container("multipart/alternative", vec![leaf("text/plain", "B")]),
            ],
        );
        assert_eq!(parse_payload(&payload).text_plain, "AB");
    }

    #[test]
    fn test_root_body_processed_before_parts() {
        let mut payload = leaf("text/plain", "root ");
        payload.parts = Some(vec![leaf("text/plain", "child")]);
        assert_eq!(parse_payload(&payload).text_plain, "root child");
    }

    #[test]
    fn test_single_part_root_message() {
        let payload = leaf("text/html", "  <p>hello</p>\n");
        let parsed = parse_payload(&payload);
        assert_eq!(parsed.text_html, "<p>hello</p>");
        assert_eq!(parsed.text_plain, "");
    }

    #[test]
    fn test_trim_happens_once_after_walk() {
        let payload = container(
            "multipart/mixed",
            vec![leaf("text/plain", "  one "), leaf("text/plain", " two  ")],
        );
        assert_eq!(parse_payload(&payload).text_plain, "one  two");
    }

    #[test]
    fn test_invalid_base64_contributes_empty_string() {
        let mut broken = leaf("text/plain", "");
        broken.body = Some(MessageBody {
            size: Some(4),
            data: Some("!!!not base64!!!".to_string()),
            attachment_id: None,
        });
        let payload = container("multipart/mixed", vec![broken, leaf("text/plain", "ok")]);
        assert_eq!(parse_payload(&payload).text_plain, "ok");
    }

    #[test]
    fn test_attachment_found_at_any_depth() {
        let payload = container(
            "multipart/mixed",
            vec![
                leaf("text/plain", "see attached"),
                container(
                    "multipart/mixed",
                    vec![container("multipart/mixed", vec![attachment("doc.pdf", "application/pdf")])],
                ),
            ],
        );
        let parsed = parse_payload(&payload);
        assert_eq!(parsed.attachments.len(), 1);
        let att = &parsed.attachments[0];
        assert_eq!(att.filename, "doc.pdf");
        assert_eq!(att.mime_type, "application/pdf");
        assert_eq!(att.size, 2048);
        assert_eq!(att.attachment_id.as_deref(), Some("att-1"));
    }

    #[test]
    fn test_text_part_with_filename_is_text_and_attachment() {
        let mut part = leaf("text/plain", "notes");
        part.filename = Some("notes.txt".to_string());
        let parsed = parse_payload(&container("multipart/mixed", vec![part]));
        assert_eq!(parsed.text_plain, "notes");
        assert_eq!(parsed.attachments.len(), 1);
        assert_eq!(parsed.attachments[0].filename, "notes.txt");
    }

    #[test]
    fn test_empty_filename_is_not_attachment() {
        let mut part = leaf("text/plain", "body");
        part.filename = Some(String::new());
        assert!(parse_payload(&part).attachments.is_empty());
    }

    #[test]
    fn test_other_text_subtypes_ignored() {
        let payload = container(
            "multipart/mixed",
            vec![leaf("text/calendar", "BEGIN:VCALENDAR"), leaf("text/plain", "x")],
        );
        let parsed = parse_payload(&payload);
        assert_eq!(parsed.text_plain, "x");
        assert_eq!(parsed.text_html, "");
    }

    #[test]
    fn test_mime_type_with_parameters() {
        let payload = leaf("text/plain; charset=\"UTF-8\"", "hi");
        assert_eq!(parse_payload(&payload).text_plain, "hi");
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(parse_payload(&MessagePayload::default()), ParsedBody::default());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let payload = container(
            "multipart/mixed",
            vec![
                leaf("text/plain", "A"),
                leaf("text/html", "<i>A</i>"),
                attachment("a.png", "image/png"),
            ],
        );
        assert_eq!(parse_payload(&payload), parse_payload(&payload));
    }

    #[test]
    fn test_parse_message_copies_envelope() {
        let mut payload = container("multipart/alternative", vec![leaf("text/plain", "Hi")]);
        payload.headers = Some(vec![Header {
            name: "Subject".to_string(),
            value: "Hello".to_string(),
        }]);
        let msg = GmailMessage {
            id: "m1".to_string(),
            thread_id: Some("t1".to_string()),
            label_ids: None,
            snippet: Some("Hi".to_string()),
            internal_date: None,
            payload: Some(payload),
        };

        let parsed = parse_message(&msg);
        assert_eq!(parsed.id.as_str(), "m1");
        assert_eq!(parsed.thread_id.as_ref().map(|t| t.as_str()), Some("t1"));
        assert_eq!(parsed.header("Subject"), Some("Hello"));
        assert_eq!(parsed.text_plain, "Hi");
    }

    #[test]
    fn test_parse_message_without_payload() {
        let msg = GmailMessage {
            id: "m2".to_string(),
            thread_id: None,
            label_ids: None,
            snippet: None,
            internal_date: None,
            payload: None,
        };
        let parsed = parse_message(&msg);
        assert!(parsed.headers.is_empty());
        assert_eq!(parsed.text_plain, "");
    }

    #[test]
    fn test_decode_base64_body() {
        // "Hello, World!" in base64url
        let encoded = "SGVsbG8sIFdvcmxkIQ";
        assert_eq!(decode_base64_body(encoded), Ok("Hello, World!".to_string()));
    }

    #[test]
    fn test_decode_base64_body_padded() {
        assert_eq!(decode_base64_body("SGk="), Ok("Hi".to_string()));
    }

    #[test]
    fn test_decode_drops_invalid_utf8() {
        let encoded = BASE64_URL_SAFE_NO_PAD.encode([b'o', 0xff, b'k']);
        assert_eq!(decode_base64_body(&encoded), Ok("ok".to_string()));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_base64_body("@@@"), Err(DecodeError));
    }
}
