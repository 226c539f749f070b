//! Gmail API client
//!
//! One session per tool invocation: `connect` authenticates, each
//! operation performs a single remote call and shapes the response.

use chrono::{SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::gmail::{API_BASE_URL, COUNT_PAGE_CAP, USER_ID};
use crate::config::Config;
use crate::error::{GmailMcpError, RemoteError, Result};
use crate::gmail::auth::Authenticator;
use crate::gmail::query::day_query;
use crate::gmail::types::{Message, MessageList, NormalizedMessage, SendMessageRequest};
use crate::gmail::utils::{build_raw_email, encode_raw_message, extract_body_text, find_header};

/// Gmail API client, scoped to a single tool invocation
pub struct GmailClient {
    http_client: reqwest::Client,
    authenticator: Authenticator,
}

impl GmailClient {
    /// Build an authenticated session
    ///
    /// Loads client credentials and the stored token; fails when either
    /// is unavailable, so no remote call ever runs unauthenticated.
    pub async fn connect(config: &Config) -> Result<Self> {
        Ok(Self {
            http_client: reqwest::Client::new(),
            authenticator: Authenticator::connect(config).await?,
        })
    }

    async fn access_token(&self) -> Result<String> {
        self.authenticator.access_token().await
    }

    fn messages_url() -> String {
        format!("{}/users/{}/messages", API_BASE_URL, USER_ID)
    }

    /// List message ids matching a query, single page only
    ///
    /// Returns at most `max_results` ids in the order the service returns
    /// them; no ordering is guaranteed beyond that.
    pub async fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>> {
        let token = self.access_token().await?;
        let url = format!(
            "{}?q={}&maxResults={}",
            Self::messages_url(),
            urlencoding::encode(query),
            max_results
        );

        let response = self.http_client.get(&url).bearer_auth(&token).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Remote(RemoteError::RequestFailed {
                message: format!("Failed to list messages ({}): {}", status, text),
            }));
        }

        let list: MessageList = response.json().await?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    /// Fetch one message and normalize it
    pub async fn get_message(&self, message_id: &str) -> Result<NormalizedMessage> {
        let token = self.access_token().await?;
        let url = format!("{}/{}?format=full", Self::messages_url(), message_id);

        let response = self.http_client.get(&url).bearer_auth(&token).send().await?;

        if response.status().as_u16() == 404 {
            return Err(GmailMcpError::Remote(RemoteError::MessageNotFound {
                message_id: message_id.to_string(),
            }));
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Remote(RemoteError::RequestFailed {
                message: format!("Failed to get message ({}): {}", status, text),
            }));
        }

        let message: Message = response.json().await?;
        Ok(normalize_message(message))
    }

    /// Send a plain-text email, returning the remote message id
    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<String> {
        let token = self.access_token().await?;

        let raw = build_raw_email(to, subject, body);
        let request = SendMessageRequest {
            raw: encode_raw_message(&raw),
        };

        let url = format!("{}/send", Self::messages_url());
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Remote(RemoteError::RequestFailed {
                message: format!("Failed to send email ({}): {}", status, text),
            }));
        }

        let sent: Message = response.json().await?;
        Ok(sent.id)
    }

    /// Count messages received today in the given timezone
    ///
    /// Single page capped at 500 ids: an approximate count for very
    /// high-volume days, preserved deliberately.
    pub async fn count_today(&self, tz: Tz) -> Result<usize> {
        let query = day_query(tz, Utc::now());
        let ids = self.list_message_ids(&query, COUNT_PAGE_CAP).await?;
        Ok(ids.len())
    }
}

/// Project a raw API message onto the normalized read shape
pub fn normalize_message(message: Message) -> NormalizedMessage {
    let payload = message.payload.as_ref();

    let subject = payload
        .and_then(|p| find_header(p, "subject"))
        .unwrap_or("")
        .to_string();

    let from = payload
        .and_then(|p| find_header(p, "from"))
        .unwrap_or("")
        .to_string();

    // internalDate is epoch millis rendered as a string.
    let date_iso = message
        .internal_date
        .as_deref()
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default();

    let body_text = payload.map(extract_body_text).unwrap_or_default();

    NormalizedMessage {
        id: message.id,
        thread_id: message.thread_id,
        subject,
        from,
        date_iso,
        snippet: message.snippet.unwrap_or_default(),
        body_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::types::{Header, MessagePart, MessagePartBody};

    fn sample_message() -> Message {
        Message {
            id: "m-1".to_string(),
            thread_id: Some("t-1".to_string()),
            snippet: Some("preview".to_string()),
            internal_date: Some("1710111000000".to_string()),
            payload: Some(MessagePart {
                mime_type: Some("text/plain".to_string()),
                headers: vec![
                    Header {
                        name: "SUBJECT".to_string(),
                        value: "Hello".to_string(),
                    },
                    Header {
                        name: "From".to_string(),
                        value: "alice@example.com".to_string(),
                    },
                ],
                body: Some(MessagePartBody {
                    size: 4,
                    data: Some(encode_raw_message("body")),
                }),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_normalize_message() {
        let normalized = normalize_message(sample_message());
        assert_eq!(normalized.id, "m-1");
        assert_eq!(normalized.thread_id.as_deref(), Some("t-1"));
        // Headers matched case-insensitively.
        assert_eq!(normalized.subject, "Hello");
        assert_eq!(normalized.from, "alice@example.com");
        // 1710111000000 ms = 2024-03-10T22:50:00.000Z
        assert_eq!(normalized.date_iso, "2024-03-10T22:50:00.000Z");
        assert_eq!(normalized.snippet, "preview");
        assert_eq!(normalized.body_text, "body");
    }

    #[test]
    fn test_normalize_message_without_payload() {
        let message = Message {
            id: "m-2".to_string(),
            thread_id: None,
            snippet: None,
            payload: None,
            internal_date: None,
        };
        let normalized = normalize_message(message);
        assert_eq!(normalized.subject, "");
        assert_eq!(normalized.from, "");
        assert_eq!(normalized.date_iso, "");
        assert_eq!(normalized.body_text, "");
    }

    #[test]
    fn test_normalize_message_bad_internal_date() {
        let mut message = sample_message();
        message.internal_date = Some("not-a-number".to_string());
        let normalized = normalize_message(message);
        assert_eq!(normalized.date_iso, "");
    }
}
