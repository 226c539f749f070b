//! Gmail API type definitions
//!
//! Wire types mirroring the Gmail API message resources, plus the
//! normalized read-only projection returned by `gmail_read`.

use serde::{Deserialize, Serialize};

/// A Gmail message part (MIME part)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    /// MIME type of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Filename for attachments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Headers for this part
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,

    /// Body of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<MessagePartBody>,

    /// Nested parts (for multipart messages)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

/// Header in a message part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Header name
    pub name: String,

    /// Header value
    pub value: String,
}

/// Body of a message part
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePartBody {
    /// Size in bytes
    #[serde(default)]
    pub size: i64,

    /// Base64url-encoded data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A Gmail message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message ID
    pub id: String,

    /// Thread ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Snippet (preview text precomputed by the service)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    /// Message payload (MIME structure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,

    /// Internal date (epoch millis, as a string)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_date: Option<String>,
}

/// List of messages response (one page)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    /// Messages in this page
    #[serde(default)]
    pub messages: Vec<MessageRef>,

    /// Next page token (unused: the server never paginates)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Reference to a message (id and thread id only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    /// Message ID
    pub id: String,

    /// Thread ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Request to send a raw message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Raw RFC822 message (base64url encoded, no padding)
    pub raw: String,
}

/// Normalized read-only projection of a message, built fresh per read
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMessage {
    /// Message ID
    pub id: String,

    /// Thread ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Subject header (empty when absent)
    pub subject: String,

    /// From header (empty when absent)
    pub from: String,

    /// ISO-8601 timestamp derived from the internal date
    pub date_iso: String,

    /// Service-precomputed preview text
    pub snippet: String,

    /// Extracted plain-text body (HTML fallback with tags stripped)
    pub body_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_deserialize() {
        let json = r#"{"id":"123","threadId":"456","snippet":"hello","internalDate":"1700000000000"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, "123");
        assert_eq!(msg.thread_id, Some("456".to_string()));
        assert_eq!(msg.internal_date, Some("1700000000000".to_string()));
    }

    #[test]
    fn test_message_list_deserialize_empty() {
        // An empty result page omits the "messages" key entirely.
        let list: MessageList = serde_json::from_str("{}").unwrap();
        assert!(list.messages.is_empty());
    }

    #[test]
    fn test_nested_parts_deserialize() {
        let json = r#"{
            "mimeType": "multipart/alternative",
            "parts": [
                {"mimeType": "text/plain", "body": {"size": 5, "data": "aGVsbG8"}},
                {"mimeType": "text/html", "body": {"size": 12, "data": "PGI-aGVsbG88L2I-"}}
            ]
        }"#;
        let part: MessagePart = serde_json::from_str(json).unwrap();
        assert_eq!(part.parts.len(), 2);
        assert_eq!(part.parts[0].mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_normalized_message_serialize_camel_case() {
        let msg = NormalizedMessage {
            id: "m1".to_string(),
            thread_id: None,
            subject: "s".to_string(),
            from: "f".to_string(),
            date_iso: "2024-01-01T00:00:00.000Z".to_string(),
            snippet: "sn".to_string(),
            body_text: "b".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"dateIso\""));
        assert!(json.contains("\"bodyText\""));
        assert!(!json.contains("threadId"));
    }
}
