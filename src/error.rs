//! Error types for the Gmail MCP server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;

/// Main error type for the Gmail MCP server
#[derive(Error, Debug)]
pub enum GmailMcpError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// OAuth authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Gmail API errors
    #[error("Gmail API error: {0}")]
    Remote(#[from] RemoteError),

    /// Tool input validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Credentials file not found: {path}")]
    CredentialsFileNotFound { path: String },

    #[error("Invalid credentials format: expected an 'installed' or 'web' object")]
    InvalidCredentialsFormat,

    #[error("Malformed credentials file: {message}")]
    MalformedCredentials { message: String },

    #[error("Invalid redirect URI: {uri}")]
    InvalidRedirectUri { uri: String },
}

/// OAuth authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token file not found: {path} (run 'gmail-mcp auth' first)")]
    TokenNotFound { path: String },

    #[error("Malformed token file: {message}")]
    InvalidToken { message: String },

    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Failed to refresh access token: {message}")]
    TokenRefreshFailed { message: String },

    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String },

    #[error("OAuth callback error: {message}")]
    CallbackError { message: String },

    #[error("No authorization code received")]
    NoAuthCode,
}

/// Gmail API errors
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Message not found: {message_id}")]
    MessageNotFound { message_id: String },

    #[error("API request failed: {message}")]
    RequestFailed { message: String },
}

/// Tool input validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Parameter {name} out of range: must be between {min} and {max}")]
    OutOfRange { name: String, min: u32, max: u32 },
}

/// Result type alias for Gmail MCP operations
pub type Result<T> = std::result::Result<T, GmailMcpError>;
