//! Gmail utility functions
//!
//! Base64url codec, MIME body extraction, and raw message construction.

use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};

use crate::error::{Result, ValidationError};
use crate::gmail::types::MessagePart;

/// Encode a raw email message for the Gmail API (base64url, no padding)
pub fn encode_raw_message(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Decode base64url data from the Gmail API
///
/// The API typically returns unpadded base64url, but padded input is
/// accepted too.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| URL_SAFE.decode(data))
        .map_err(|e| {
            crate::error::GmailMcpError::Validation(ValidationError::InvalidParameter {
                name: "base64 data".to_string(),
                message: e.to_string(),
            })
        })
}

/// Decode base64url data to a UTF-8 string
pub fn decode_base64url_string(data: &str) -> Result<String> {
    let bytes = decode_base64url(data)?;
    String::from_utf8(bytes).map_err(|e| {
        crate::error::GmailMcpError::Validation(ValidationError::InvalidParameter {
            name: "UTF-8 content".to_string(),
            message: e.to_string(),
        })
    })
}

/// Pre-order depth-first search over a MIME part tree
///
/// Returns the first part matching the predicate, visiting each node
/// before its children.
pub fn find_part<'a, F>(part: &'a MessagePart, pred: &F) -> Option<&'a MessagePart>
where
    F: Fn(&MessagePart) -> bool,
{
    if pred(part) {
        return Some(part);
    }
    for child in &part.parts {
        if let Some(found) = find_part(child, pred) {
            return Some(found);
        }
    }
    None
}

fn data_leaf(mime: &'static str) -> impl Fn(&MessagePart) -> bool {
    move |p: &MessagePart| {
        p.mime_type.as_deref() == Some(mime)
            && p.body.as_ref().and_then(|b| b.data.as_ref()).is_some()
    }
}

fn leaf_data<'a>(part: &'a MessagePart) -> Option<&'a str> {
    part.body.as_ref().and_then(|b| b.data.as_deref())
}

/// Extract body text from a (possibly multipart) message payload
///
/// Prefers the first `text/plain` leaf anywhere in the tree; falls back to
/// the first `text/html` leaf with tags stripped; empty when neither
/// exists or decoding fails.
pub fn extract_body_text(payload: &MessagePart) -> String {
    if let Some(part) = find_part(payload, &data_leaf("text/plain")) {
        if let Some(data) = leaf_data(part) {
            match decode_base64url_string(data) {
                Ok(text) => return text,
                Err(e) => tracing::debug!("failed to decode text/plain part: {}", e),
            }
        }
    }

    if let Some(part) = find_part(payload, &data_leaf("text/html")) {
        if let Some(data) = leaf_data(part) {
            match decode_base64url_string(data) {
                Ok(html) => return strip_html_tags(&html),
                Err(e) => tracing::debug!("failed to decode text/html part: {}", e),
            }
        }
    }

    String::new()
}

/// Strip `<...>` tag markup, replacing each tag with a single space
///
/// Deliberately lossy: not an HTML parser, and entities are left
/// undecoded.
pub fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Build a minimal plain-text RFC 2822 message, CRLF-joined
pub fn build_raw_email(to: &str, subject: &str, body: &str) -> String {
    [
        format!("To: {}", to),
        format!("Subject: {}", subject),
        "Content-Type: text/plain; charset=\"UTF-8\"".to_string(),
        "MIME-Version: 1.0".to_string(),
        String::new(),
        body.to_string(),
    ]
    .join("\r\n")
}

/// Find a header value by name (case-insensitive)
pub fn find_header<'a>(part: &'a MessagePart, name: &str) -> Option<&'a str> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::types::{Header, MessagePartBody};

    fn leaf(mime: &str, data: &str) -> MessagePart {
        MessagePart {
            mime_type: Some(mime.to_string()),
            body: Some(MessagePartBody {
                size: data.len() as i64,
                data: Some(data.to_string()),
            }),
            ..Default::default()
        }
    }

    fn multipart(mime: &str, parts: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            mime_type: Some(mime.to_string()),
            parts,
            ..Default::default()
        }
    }

    #[test]
    fn test_base64url_round_trip() {
        // Inputs chosen so the standard alphabet would need '+', '/' and
        // padding: every length mod 4 is covered.
        let cases = [
            "",
            "a",
            "ab",
            "abc",
            "abcd",
            "subject with spaces + plus / slash",
            "ünïcode ❤ body\r\nwith CRLF",
            "\u{00ff}\u{00fe}??>>??",
        ];
        for case in cases {
            let encoded = encode_raw_message(case);
            assert!(!encoded.contains('+'));
            assert!(!encoded.contains('/'));
            assert!(!encoded.contains('='));
            let decoded = decode_base64url_string(&encoded).unwrap();
            assert_eq!(decoded, *case);
        }
    }

    #[test]
    fn test_decode_accepts_padded_input() {
        // "Ma" encodes to "TWE=" with padding.
        assert_eq!(decode_base64url("TWE=").unwrap(), b"Ma");
        assert_eq!(decode_base64url("TWE").unwrap(), b"Ma");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_base64url("!!!not base64!!!").is_err());
    }

    #[test]
    fn test_strip_html_tags() {
        let text = strip_html_tags("<b>Hi</b> there");
        assert!(!text.contains('<'));
        assert!(!text.contains('>'));
        assert!(text.contains("Hi"));
        assert!(text.contains("there"));
    }

    #[test]
    fn test_strip_html_tags_leaves_entities() {
        assert_eq!(strip_html_tags("a &amp; b"), "a &amp; b");
    }

    #[test]
    fn test_extract_prefers_plain_over_html() {
        // "plain body" / "<b>html</b>" base64url-encoded
        let payload = multipart(
            "multipart/alternative",
            vec![
                leaf("text/html", &encode_raw_message("<b>html</b>")),
                multipart(
                    "multipart/related",
                    vec![leaf("text/plain", &encode_raw_message("plain body"))],
                ),
            ],
        );
        assert_eq!(extract_body_text(&payload), "plain body");
    }

    #[test]
    fn test_extract_html_fallback_strips_tags() {
        let payload = multipart(
            "multipart/alternative",
            vec![leaf("text/html", &encode_raw_message("<b>Hi</b> there"))],
        );
        let text = extract_body_text(&payload);
        assert!(!text.contains('<'));
        assert!(text.contains("Hi"));
        assert!(text.contains("there"));
    }

    #[test]
    fn test_extract_empty_when_no_text_parts() {
        let payload = multipart(
            "multipart/mixed",
            vec![leaf("image/png", "aWdub3JlZA")],
        );
        assert_eq!(extract_body_text(&payload), "");
    }

    #[test]
    fn test_find_part_pre_order() {
        let payload = multipart(
            "multipart/mixed",
            vec![
                leaf("text/plain", "Zmlyc3Q"),
                leaf("text/plain", "c2Vjb25k"),
            ],
        );
        let found = find_part(&payload, &data_leaf("text/plain")).unwrap();
        assert_eq!(leaf_data(found), Some("Zmlyc3Q"));
    }

    #[test]
    fn test_build_raw_email() {
        let raw = build_raw_email("user@example.com", "Hello", "Body text");
        let lines: Vec<&str> = raw.split("\r\n").collect();
        assert_eq!(lines[0], "To: user@example.com");
        assert_eq!(lines[1], "Subject: Hello");
        assert_eq!(lines[2], "Content-Type: text/plain; charset=\"UTF-8\"");
        assert_eq!(lines[3], "MIME-Version: 1.0");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "Body text");
    }

    #[test]
    fn test_find_header_case_insensitive() {
        let part = MessagePart {
            headers: vec![
                Header {
                    name: "Subject".to_string(),
                    value: "Test".to_string(),
                },
                Header {
                    name: "FROM".to_string(),
                    value: "a@b.com".to_string(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(find_header(&part, "subject"), Some("Test"));
        assert_eq!(find_header(&part, "from"), Some("a@b.com"));
        assert_eq!(find_header(&part, "date"), None);
    }
}
