//! MCP server implementation
//!
//! JSON-RPC 2.0 over stdio: one request per line in, one response per
//! line out. Stdout carries only protocol frames; logging goes to stderr.

use std::io::{BufRead, Write};

use serde_json::Value;

use crate::config::Config;
use crate::error::Result;
use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;

const SERVER_NAME: &str = "gmail-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP server for Gmail tools
pub struct McpServer {
    tool_handler: ToolHandler,
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(config: Config) -> Self {
        Self {
            tool_handler: ToolHandler::new(config),
            initialized: false,
        }
    }

    /// Run the server on stdio until the transport closes
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();

        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match self.handle_message(&line).await {
                Ok(Some(response)) => {
                    let response_str = serde_json::to_string(&response)?;
                    writeln!(stdout, "{}", response_str)?;
                    stdout.flush()?;
                }
                Ok(None) => {
                    // Notification, no response needed
                }
                Err(e) => {
                    tracing::error!("error handling message: {}", e);
                }
            }
        }

        Ok(())
    }

    /// Handle one incoming JSON-RPC message
    async fn handle_message(&mut self, message: &str) -> Result<Option<JsonRpcResponse>> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                return Ok(Some(JsonRpcResponse::error(
                    RequestId::Number(0),
                    JsonRpcError::parse_error(e.to_string()),
                )));
            }
        };

        if request.method == methods::INITIALIZED {
            self.initialized = true;
            return Ok(None);
        }

        // A message without an id is a notification; it is never answered,
        // not even with an error.
        let id = match request.id.clone() {
            Some(id) => id,
            None => {
                tracing::debug!("ignoring notification: {}", request.method);
                return Ok(None);
            }
        };

        match request.method.as_str() {
            methods::INITIALIZE => {
                let result = self.handle_initialize()?;
                Ok(Some(JsonRpcResponse::success(id, result)))
            }
            methods::PING => Ok(Some(JsonRpcResponse::success(id, serde_json::json!({})))),
            methods::LIST_TOOLS => {
                let result = serde_json::to_value(ListToolsResult {
                    tools: self.tool_handler.list_tools(),
                })?;
                Ok(Some(JsonRpcResponse::success(id, result)))
            }
            methods::CALL_TOOL => {
                let result = self.handle_call_tool(&request).await;
                Ok(Some(JsonRpcResponse::success(id, result)))
            }
            _ => Ok(Some(JsonRpcResponse::error(
                id,
                JsonRpcError::method_not_found(&request.method),
            ))),
        }
    }

    fn handle_initialize(&self) -> Result<Value> {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Tool-call failures become successful JSON-RPC responses carrying
    /// an `isError` result, never protocol errors.
    async fn handle_call_tool(&self, request: &JsonRpcRequest) -> Value {
        let params: CallToolParams = match request.params.as_ref() {
            Some(p) => match serde_json::from_value(p.clone()) {
                Ok(params) => params,
                Err(e) => {
                    return serde_json::to_value(CallToolResult::error(format!(
                        "Invalid tool parameters: {}",
                        e
                    )))
                    .unwrap_or(Value::Null);
                }
            },
            None => {
                return serde_json::to_value(CallToolResult::error("Missing tool parameters"))
                    .unwrap_or(Value::Null);
            }
        };

        let result = self
            .tool_handler
            .call_tool(&params.name, params.arguments)
            .await;
        serde_json::to_value(result).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> McpServer {
        let config = Config {
            credentials_path: "/nonexistent/credentials.json".into(),
            token_path: "/nonexistent/token.json".into(),
            default_timezone: "UTC".to_string(),
            scopes: vec![],
        };
        McpServer::new(config)
    }

    #[tokio::test]
    async fn test_initialize() {
        let mut s = server();
        let response = s
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
            .await
            .unwrap()
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_initialized_notification_has_no_response() {
        // Notifications carry no id.
        let mut s = server();
        let response = s
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .unwrap();
        assert!(response.is_none());
        assert!(s.initialized);
    }

    #[tokio::test]
    async fn test_initialized_notification_with_id_still_silent() {
        // Some clients send the notification with an id anyway; it is
        // still not answered.
        let mut s = server();
        let response = s
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"notifications/initialized"}"#)
            .await
            .unwrap();
        assert!(response.is_none());
        assert!(s.initialized);
    }

    #[tokio::test]
    async fn test_unknown_notification_is_dropped() {
        // No id means no response, even for methods the server does not
        // know.
        let mut s = server();
        let response = s
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/cancelled"}"#)
            .await
            .unwrap();
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_list_tools() {
        let mut s = server();
        let response = s
            .handle_message(r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#)
            .await
            .unwrap()
            .unwrap();
        let tools = response.result.unwrap()["tools"].clone();
        assert_eq!(tools.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let mut s = server();
        let response = s
            .handle_message(r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let mut s = server();
        let response = s.handle_message("{not json").await.unwrap().unwrap();
        assert_eq!(response.error.unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_call_tool_validation_failure_is_tool_result() {
        let mut s = server();
        let response = s
            .handle_message(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"gmail_list","arguments":{"maxResults":51}}}"#,
            )
            .await
            .unwrap()
            .unwrap();
        // Validation failures ride inside a successful JSON-RPC response.
        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
    }
}
