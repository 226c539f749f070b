//! OAuth credentials and tokens for the Gmail API
//!
//! Three concerns live here:
//! - loading client credentials and the stored token from disk
//! - the per-session authenticator that refreshes access tokens
//! - the one-shot interactive authorization flow
//!
//! The token file is only ever created from scratch by the authorizer;
//! refreshes merge into it field-by-field so fields the token endpoint
//! omits (usually the refresh token) are preserved.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::{gmail, Config};
use crate::error::{AuthError, ConfigError, GmailMcpError, Result};

/// OAuth client credentials (the "client secrets" file contents)
#[derive(Debug, Clone, Deserialize)]
pub struct ClientCredentials {
    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Redirect URIs
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

/// Credentials file format: desktop apps use "installed", web apps "web"
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientCredentials>,
    web: Option<ClientCredentials>,
}

impl CredentialsFile {
    /// "installed" wins when a file carries both keys
    fn into_keys(self) -> Option<ClientCredentials> {
        self.installed.or(self.web)
    }
}

impl ClientCredentials {
    /// Load client credentials from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GmailMcpError::Config(ConfigError::CredentialsFileNotFound {
                path: path.display().to_string(),
            }));
        }

        let content = std::fs::read_to_string(path)?;
        let file: CredentialsFile = serde_json::from_str(&content).map_err(|e| {
            GmailMcpError::Config(ConfigError::MalformedCredentials {
                message: e.to_string(),
            })
        })?;

        file.into_keys()
            .ok_or_else(|| GmailMcpError::Config(ConfigError::InvalidCredentialsFormat))
    }

    /// The redirect URI to use: first listed, or the localhost default
    pub fn redirect_uri(&self) -> String {
        self.redirect_uris
            .first()
            .cloned()
            .unwrap_or_else(|| gmail::DEFAULT_REDIRECT_URI.to_string())
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Stored access/refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    /// Access token
    pub access_token: String,

    /// Refresh token (absent when the token endpoint omits it)
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiry timestamp (unix seconds)
    #[serde(alias = "expiry", skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    /// Granted scopes
    #[serde(default)]
    pub scope: String,
}

/// Token file storage with merge-on-write semantics
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a store for the given token file path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the underlying token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored token; absence means "not yet authorized"
    pub async fn load(&self) -> Result<StoredToken> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|_| {
            GmailMcpError::Auth(AuthError::TokenNotFound {
                path: self.path.display().to_string(),
            })
        })?;

        serde_json::from_str(&content).map_err(|e| {
            GmailMcpError::Auth(AuthError::InvalidToken {
                message: e.to_string(),
            })
        })
    }

    /// Merge a partial token into the stored file, best-effort
    ///
    /// New fields overwrite, fields absent from the partial are retained.
    /// Failures are logged and swallowed: a refreshed in-memory token must
    /// still serve the in-flight call even if persistence fails.
    pub async fn save_merged(&self, partial: &StoredToken) {
        if let Err(e) = self.try_save_merged(partial).await {
            tracing::warn!(
                "failed to persist refreshed token to {}: {}",
                self.path.display(),
                e
            );
        }
    }

    async fn try_save_merged(&self, partial: &StoredToken) -> Result<()> {
        let mut current = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str::<Value>(&raw).unwrap_or(Value::Null),
            Err(_) => Value::Null,
        };
        if !current.is_object() {
            current = serde_json::json!({});
        }

        let update = serde_json::to_value(partial)?;
        if let (Some(stored), Some(new)) = (current.as_object_mut(), update.as_object()) {
            for (key, value) in new {
                if !value.is_null() {
                    stored.insert(key.clone(), value.clone());
                }
            }
        }

        tokio::fs::write(&self.path, serde_json::to_string_pretty(&current)?).await?;
        Ok(())
    }

    /// Write a token file from scratch (authorization only)
    pub async fn replace(&self, token: &StoredToken) -> Result<()> {
        let content = serde_json::to_string_pretty(token)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

/// Token response from the OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: String,
}

impl TokenResponse {
    fn into_stored(self, fallback_refresh: Option<String>) -> StoredToken {
        let now = chrono::Utc::now().timestamp();
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(fallback_refresh),
            token_type: self.token_type,
            expiry_date: self.expires_in.map(|e| now + e),
            scope: self.scope,
        }
    }
}

/// Refresh the access token when it expires within this many seconds
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Per-session authenticator
///
/// Constructed fresh for every tool invocation: loads the client
/// credentials and the stored token, and refreshes the access token on
/// demand. Never a process-wide singleton, so overlapping invocations
/// share nothing but the token file.
pub struct Authenticator {
    http_client: reqwest::Client,
    keys: ClientCredentials,
    store: TokenStore,
    token: Arc<RwLock<StoredToken>>,
}

impl Authenticator {
    /// Load credentials and the stored token for a new session
    ///
    /// Fails outright when either file is unavailable: there is no
    /// anonymous fallback.
    pub async fn connect(config: &Config) -> Result<Self> {
        let keys = ClientCredentials::load(&config.credentials_path)?;
        let store = TokenStore::new(config.token_path.clone());
        let token = store.load().await?;

        Ok(Self {
            http_client: reqwest::Client::new(),
            keys,
            store,
            token: Arc::new(RwLock::new(token)),
        })
    }

    /// Get a valid access token, refreshing if expired or about to expire
    pub async fn access_token(&self) -> Result<String> {
        let expiring = {
            let token = self.token.read().await;
            match token.expiry_date {
                Some(expiry) => expiry - chrono::Utc::now().timestamp() < EXPIRY_MARGIN_SECS,
                None => false,
            }
        };

        if expiring {
            return self.refresh().await;
        }

        Ok(self.token.read().await.access_token.clone())
    }

    /// Refresh the access token using the stored refresh token
    ///
    /// The refreshed token is persisted best-effort through the store's
    /// merge write; persistence failure never fails the caller.
    async fn refresh(&self) -> Result<String> {
        let refresh_token = self
            .token
            .read()
            .await
            .refresh_token
            .clone()
            .ok_or(GmailMcpError::Auth(AuthError::MissingRefreshToken))?;

        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(gmail::TOKEN_URI)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Auth(AuthError::TokenRefreshFailed {
                message: text,
            }));
        }

        let token_response: TokenResponse = response.json().await?;
        let refreshed = token_response.into_stored(Some(refresh_token));

        self.store.save_merged(&refreshed).await;
        *self.token.write().await = refreshed.clone();

        Ok(refreshed.access_token)
    }
}

/// Build the authorization URL: offline access, forced consent screen
pub fn authorization_url(keys: &ClientCredentials, redirect_uri: &str, scopes: &[String]) -> String {
    let scope = scopes.join(" ");
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        gmail::AUTH_URI,
        urlencoding::encode(&keys.client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&scope)
    )
}

/// Extract the port and path the callback listener should bind from a
/// redirect URI such as `http://localhost:3000/oauth2callback`
pub fn callback_parts(redirect_uri: &str) -> Result<(u16, String)> {
    let invalid = || {
        GmailMcpError::Config(ConfigError::InvalidRedirectUri {
            uri: redirect_uri.to_string(),
        })
    };

    let rest = redirect_uri
        .strip_prefix("http://")
        .or_else(|| redirect_uri.strip_prefix("https://"))
        .ok_or_else(invalid)?;

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], rest[i..].to_string()),
        None => (rest, "/".to_string()),
    };

    let port = match authority.rsplit_once(':') {
        Some((_, port)) => port.parse().map_err(|_| invalid())?,
        None => 80,
    };

    Ok((port, path))
}

/// Decide what the callback handler does with the redirect request
///
/// Always produces an HTML page; the authorization code is forwarded only
/// when present. Split out of the handler so the no-code path is testable.
pub fn callback_outcome(params: &HashMap<String, String>) -> (Option<String>, &'static str) {
    match params.get("code") {
        Some(code) => (
            Some(code.clone()),
            "<html><body><h2>Authorized. You can close this tab and return to the terminal.</h2></body></html>",
        ),
        None => (
            None,
            "<html><body><h2>No authorization code received. You can close this tab.</h2></body></html>",
        ),
    }
}

/// Exchange an authorization code for a token pair
async fn exchange_code(
    http_client: &reqwest::Client,
    keys: &ClientCredentials,
    redirect_uri: &str,
    code: &str,
) -> Result<StoredToken> {
    let params = [
        ("client_id", keys.client_id.as_str()),
        ("client_secret", keys.client_secret.as_str()),
        ("code", code),
        ("grant_type", "authorization_code"),
        ("redirect_uri", redirect_uri),
    ];

    let response = http_client
        .post(gmail::TOKEN_URI)
        .form(&params)
        .send()
        .await?;

    if !response.status().is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(GmailMcpError::Auth(AuthError::TokenExchangeFailed {
            message: text,
        }));
    }

    let token_response: TokenResponse = response.json().await?;
    Ok(token_response.into_stored(None))
}

/// Serve the OAuth callback until the single expected request arrives
///
/// Shuts the server down gracefully after the callback so the HTML page
/// reaches the browser before the listener goes away. Returns the
/// authorization code when the redirect carried one.
async fn wait_for_callback(
    listener: tokio::net::TcpListener,
    path: &str,
) -> Result<Option<String>> {
    use axum::{extract::Query, response::Html, routing::get, Router};
    use tokio::sync::oneshot;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let shutdown_tx = Arc::new(std::sync::Mutex::new(Some(shutdown_tx)));
    let code_slot: Arc<std::sync::Mutex<Option<String>>> = Arc::default();

    let slot = code_slot.clone();
    let callback_handler = move |Query(params): Query<HashMap<String, String>>| {
        let slot = slot.clone();
        let shutdown_tx = shutdown_tx.clone();
        async move {
            let (code, page) = callback_outcome(&params);
            *slot.lock().unwrap() = code;
            if let Some(tx) = shutdown_tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
            Html(page)
        }
    };

    let app = Router::new().route(path, get(callback_handler));
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .await
        .map_err(|e| {
            GmailMcpError::Auth(AuthError::CallbackError {
                message: e.to_string(),
            })
        })?;

    let code = code_slot.lock().unwrap().take();
    Ok(code)
}

/// Run the one-time interactive authorization flow
///
/// Starts a local listener on the redirect URI's port, opens the consent
/// screen in a browser, waits for the single expected callback, exchanges
/// the code, and writes the token file from scratch. The listener serves
/// exactly one callback and shuts down regardless of outcome.
pub async fn authorize_interactive(config: &Config) -> Result<()> {
    let keys = ClientCredentials::load(&config.credentials_path)?;
    let redirect_uri = keys.redirect_uri();
    let (port, path) = callback_parts(&redirect_uri)?;

    let auth_url = authorization_url(&keys, &redirect_uri, &config.scopes);
    eprintln!("\nPlease visit this URL to authorize Gmail access:");
    eprintln!("{}\n", auth_url);

    if let Err(e) = open::that(&auth_url) {
        eprintln!("Could not open browser automatically: {}", e);
        eprintln!("Please open the URL manually.");
    }

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    eprintln!("Waiting for the authorization callback on port {}...", port);

    let code = wait_for_callback(listener, &path)
        .await?
        .ok_or(GmailMcpError::Auth(AuthError::NoAuthCode))?;

    eprintln!("Received authorization code, exchanging for tokens...");
    let http_client = reqwest::Client::new();
    let token = exchange_code(&http_client, &keys, &redirect_uri, &code).await?;

    let store = TokenStore::new(config.token_path.clone());
    store.replace(&token).await?;
    eprintln!("Saved token to {}", store.path().display());

    Ok(())
}
