//! Gmail MCP server
//!
//! A Model Context Protocol (MCP) server exposing a small set of Gmail
//! operations (list, read, send, count-today) as tools, plus a one-time
//! OAuth2 authorization flow.

pub mod config;
pub mod error;
pub mod gmail;
pub mod mcp;

pub use config::Config;
pub use error::{GmailMcpError, Result};
