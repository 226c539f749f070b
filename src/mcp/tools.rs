//! MCP tool definitions and handlers
//!
//! Four Gmail tools. Each invocation deserializes and validates its
//! arguments, then builds a fresh authenticated session and performs one
//! remote call. Every failure surfaces as an `isError` tool result.

use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{gmail, Config};
use crate::error::{GmailMcpError, Result, ValidationError};
use crate::gmail::client::GmailClient;
use crate::mcp::types::{CallToolResult, Tool};

/// Tool handler
///
/// Holds only the configuration: the Gmail session is constructed per
/// call, so overlapping invocations never share client or auth state.
pub struct ToolHandler {
    config: Config,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def(
                "gmail_send",
                "Send a plain-text email",
                json!({
                    "type": "object",
                    "properties": {
                        "to": {
                            "type": "string",
                            "description": "Recipient email, e.g. user@example.com"
                        },
                        "subject": {
                            "type": "string",
                            "description": "Email subject"
                        },
                        "body": {
                            "type": "string",
                            "description": "Plain text body"
                        }
                    },
                    "required": ["to", "subject", "body"]
                }),
            ),
            tool_def(
                "gmail_list",
                "List message ids matching a Gmail search query",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Gmail search query, e.g. \"from:amazon\"",
                            "default": gmail::DEFAULT_LIST_QUERY
                        },
                        "maxResults": {
                            "type": "integer",
                            "description": "How many messages to list",
                            "minimum": 1,
                            "maximum": gmail::MAX_LIST_RESULTS,
                            "default": gmail::DEFAULT_MAX_RESULTS
                        }
                    }
                }),
            ),
            tool_def(
                "gmail_read",
                "Read one email by id",
                json!({
                    "type": "object",
                    "properties": {
                        "id": {
                            "type": "string",
                            "description": "Gmail message id"
                        }
                    },
                    "required": ["id"]
                }),
            ),
            tool_def(
                "gmail_count_today",
                "Count messages received today (server timezone)",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
        ]
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        match name {
            "gmail_send" => self.handle_send(args).await,
            "gmail_list" => self.handle_list(args).await,
            "gmail_read" => self.handle_read(args).await,
            "gmail_count_today" => self.handle_count_today().await,
            _ => CallToolResult::error(format!("Unknown tool: {}", name)),
        }
    }

    async fn client(&self) -> Result<GmailClient> {
        GmailClient::connect(&self.config).await
    }

    async fn handle_send(&self, args: Value) -> CallToolResult {
        #[derive(Deserialize)]
        struct Args {
            to: String,
            subject: String,
            body: String,
        }

        let args: Args = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return CallToolResult::error(format!("Invalid arguments: {}", e)),
        };

        let result = async {
            let client = self.client().await?;
            client.send_email(&args.to, &args.subject, &args.body).await
        }
        .await;

        match result {
            Ok(id) => CallToolResult::text(format!("Sent! messageId={}", id)),
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    async fn handle_list(&self, args: Value) -> CallToolResult {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[serde(default = "default_query")]
            query: String,
            #[serde(default = "default_max_results")]
            max_results: u32,
        }

        fn default_query() -> String {
            gmail::DEFAULT_LIST_QUERY.to_string()
        }

        fn default_max_results() -> u32 {
            gmail::DEFAULT_MAX_RESULTS
        }

        let args: Args = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return CallToolResult::error(format!("Invalid arguments: {}", e)),
        };

        // Range check before any remote call.
        if let Err(e) = validate_max_results(args.max_results) {
            return CallToolResult::error(e.to_string());
        }

        let result = async {
            let client = self.client().await?;
            client.list_message_ids(&args.query, args.max_results).await
        }
        .await;

        match result {
            Ok(ids) => match serde_json::to_string_pretty(&ids) {
                Ok(text) => CallToolResult::text(text),
                Err(e) => CallToolResult::error(e.to_string()),
            },
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    async fn handle_read(&self, args: Value) -> CallToolResult {
        #[derive(Deserialize)]
        struct Args {
            id: String,
        }

        let args: Args = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return CallToolResult::error(format!("Invalid arguments: {}", e)),
        };

        let result = async {
            let client = self.client().await?;
            client.get_message(&args.id).await
        }
        .await;

        match result {
            Ok(m) => {
                let pretty = json!({
                    "id": m.id,
                    "from": m.from,
                    "subject": m.subject,
                    "dateIso": m.date_iso,
                    "snippet": m.snippet,
                    "bodyText": m.body_text,
                });
                match serde_json::to_string_pretty(&pretty) {
                    Ok(text) => CallToolResult::text(text),
                    Err(e) => CallToolResult::error(e.to_string()),
                }
            }
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    /// The configured timezone, falling back to UTC with a warning
    fn resolved_timezone(&self) -> Tz {
        match self.config.default_timezone.parse() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!(
                    "unrecognized timezone {:?}, falling back to UTC",
                    self.config.default_timezone
                );
                Tz::UTC
            }
        }
    }

    async fn handle_count_today(&self) -> CallToolResult {
        let tz = self.resolved_timezone();

        let result = async {
            let client = self.client().await?;
            client.count_today(tz).await
        }
        .await;

        match result {
            Ok(n) => CallToolResult::text(n.to_string()),
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }
}

/// `maxResults` must be within 1..=50 inclusive
fn validate_max_results(max_results: u32) -> Result<()> {
    if !(1..=gmail::MAX_LIST_RESULTS).contains(&max_results) {
        return Err(GmailMcpError::Validation(ValidationError::OutOfRange {
            name: "maxResults".to_string(),
            min: 1,
            max: gmail::MAX_LIST_RESULTS,
        }));
    }
    Ok(())
}

fn tool_def(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}
