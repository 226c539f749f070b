//! Configuration for the Gmail MCP server
//!
//! Paths and the default timezone come from environment variables, with
//! working-directory defaults so a plain `credentials.json` + `token.json`
//! pair next to the binary just works.

use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the OAuth client credentials file
    pub credentials_path: PathBuf,

    /// Path to the stored access/refresh token file
    pub token_path: PathBuf,

    /// Default IANA timezone for day-boundary queries
    pub default_timezone: String,

    /// Gmail API scopes requested during authorization
    pub scopes: Vec<String>,
}

impl Config {
    /// Build a configuration from the environment
    pub fn from_env() -> Self {
        let credentials_path = std::env::var("GMAIL_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./credentials.json"));

        let token_path = std::env::var("GMAIL_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./token.json"));

        let default_timezone = std::env::var("TZ").unwrap_or_else(|_| "UTC".to_string());

        Self {
            credentials_path,
            token_path,
            default_timezone,
            scopes: vec![
                "https://www.googleapis.com/auth/gmail.readonly".to_string(),
                "https://www.googleapis.com/auth/gmail.send".to_string(),
            ],
        }
    }

    /// Check if a stored token exists (i.e. `auth` has been run)
    pub fn token_exists(&self) -> bool {
        self.token_path.exists()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Gmail API constants
pub mod gmail {
    /// Base URL for the Gmail API
    pub const API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

    /// User ID for the authenticated user
    pub const USER_ID: &str = "me";

    /// Google OAuth2 authorization endpoint
    pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";

    /// Google OAuth2 token endpoint
    pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

    /// Redirect URI used when the credentials file lists none
    pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/oauth2callback";

    /// Default search query for `gmail_list`
    pub const DEFAULT_LIST_QUERY: &str = "in:inbox newer_than:7d";

    /// Default number of results for `gmail_list`
    pub const DEFAULT_MAX_RESULTS: u32 = 10;

    /// Upper bound on `maxResults` for `gmail_list`
    pub const MAX_LIST_RESULTS: u32 = 50;

    /// Single-page cap for `gmail_count_today`; days with more messages
    /// are undercounted, an accepted approximation
    pub const COUNT_PAGE_CAP: u32 = 500;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        // Only assert the fallback defaults when the env vars are unset,
        // so the test is stable under developer environments.
        let config = Config::from_env();
        if std::env::var("GMAIL_CREDENTIALS_PATH").is_err() {
            assert_eq!(config.credentials_path, PathBuf::from("./credentials.json"));
        }
        if std::env::var("GMAIL_TOKEN_PATH").is_err() {
            assert_eq!(config.token_path, PathBuf::from("./token.json"));
        }
    }

    #[test]
    fn test_scopes() {
        let config = Config::from_env();
        assert_eq!(config.scopes.len(), 2);
        assert!(config.scopes[0].contains("gmail.readonly"));
        assert!(config.scopes[1].contains("gmail.send"));
    }
}
