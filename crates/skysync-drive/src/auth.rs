//! OAuth2 authorization flow for the Google Drive API
//!
//! Implements the Authorization Code flow with PKCE (RFC 7636) for an
//! installed desktop application. Google installed-app credentials carry a
//! client secret in `client_secret.json`; both the secret and the PKCE
//! challenge are sent, matching what the Google endpoints expect.
//!
//! ## Components
//!
//! - [`ClientSecret`] - Parsed installed-app credentials file
//! - [`AuthFlow`] - OAuth2 authorize/exchange/refresh logic
//! - [`LocalCallbackServer`] - Minimal HTTP server for the OAuth redirect
//! - [`DriveAuthAdapter`] - Orchestrates the full authorization flow

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, CsrfToken, EndpointNotSet,
    EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope,
    TokenResponse, TokenUrl,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use skysync_core::domain::newtypes::ProviderKind;
use skysync_core::ports::remote_store::StoreError;

use crate::credentials::Tokens;

/// Google OAuth2 authorization endpoint
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2 token endpoint
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Redirect URI for the local callback server
const REDIRECT_URI: &str = "http://127.0.0.1:8917/callback";

/// Port the callback server binds (must match [`REDIRECT_URI`])
const CALLBACK_ADDR: &str = "127.0.0.1:8917";

/// OAuth2 scope: access only to files this application creates
const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

// ============================================================================
// ClientSecret
// ============================================================================

/// Installed-application credentials as downloaded from the Google Cloud
/// console (`client_secret.json`)
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    /// The `"installed"` section of the credentials file
    pub installed: InstalledApp,
}

/// The `installed` block of a `client_secret.json`
#[derive(Debug, Clone, Deserialize)]
pub struct InstalledApp {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
}

impl ClientSecret {
    /// Loads and parses a `client_secret.json` file
    ///
    /// A missing file is an operator misconfiguration and surfaces as
    /// [`StoreError::MissingCredentialFile`] so the daemon can report it
    /// distinctly from a revoked authorization.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::MissingCredentialFile(path.to_path_buf()));
            }
            Err(e) => {
                return Err(StoreError::Unexpected(anyhow::Error::new(e).context(
                    format!("Failed to read client secret file {}", path.display()),
                )))
            }
        };

        let secret: ClientSecret = serde_json::from_str(&json)
            .context("Failed to parse client secret file")
            .map_err(StoreError::Unexpected)?;
        debug!(path = %path.display(), "Loaded client secret file");
        Ok(secret)
    }
}

// ============================================================================
// AuthFlow
// ============================================================================

/// OAuth2 authorization code flow implementation using the `oauth2` crate
///
/// Handles generating authorization URLs with PKCE challenges, exchanging
/// authorization codes for tokens, and refreshing tokens.
pub struct AuthFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
}

impl AuthFlow {
    /// Creates a new AuthFlow from installed-app credentials
    pub fn new(secret: &ClientSecret) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(secret.installed.client_id.clone()))
            .set_client_secret(oauth2::ClientSecret::new(
                secret.installed.client_secret.clone(),
            ))
            .set_auth_uri(AuthUrl::new(AUTH_URL.to_string()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(TOKEN_URL.to_string()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(REDIRECT_URI.to_string()).context("Invalid redirect URI")?,
            );

        Ok(Self { client })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// # Returns
    /// A tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    /// The `pkce_verifier` must be kept until the code exchange step.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(DRIVE_FILE_SCOPE.to_string()))
            // Google only issues a refresh token when offline access is
            // requested and consent is forced on re-authorization.
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for OAuth tokens
    ///
    /// # Arguments
    /// * `code` - The authorization code received from the callback
    /// * `pkce_verifier` - The PKCE verifier generated alongside the auth URL
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<Tokens> {
        info!("Exchanging authorization code for tokens");

        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
            .context("Failed to exchange authorization code")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            expires_at,
        };

        info!("Successfully obtained OAuth tokens");
        Ok(tokens)
    }

    /// Refreshes an expired access token using a refresh token
    ///
    /// # Returns
    /// New OAuth tokens with a fresh access token. Google omits the refresh
    /// token from refresh responses, so the existing one is carried forward.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        info!("Refreshing access token");

        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&http_client)
            .await
            .context("Failed to refresh token")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at,
        };

        info!("Successfully refreshed access token");
        Ok(tokens)
    }
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Minimal HTTP server that listens on localhost for the OAuth2 redirect callback.
///
/// Starts an HTTP server on `127.0.0.1:8917` that waits for Google to
/// redirect the user's browser back with an authorization code. Once the
/// code is received, it responds with a success HTML page and shuts down.
pub struct LocalCallbackServer;

/// Parameters extracted from the OAuth2 callback
#[derive(Debug)]
pub struct CallbackParams {
    /// The authorization code
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

impl LocalCallbackServer {
    /// Starts the local callback server and waits for the OAuth redirect
    ///
    /// # Returns
    /// The callback parameters (code and state) extracted from the redirect URL
    pub async fn start() -> Result<CallbackParams> {
        use http_body_util::Full;
        use hyper::body::Bytes;
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, Response, StatusCode};
        use hyper_util::rt::TokioIo;
        use tokio::net::TcpListener;
        use tokio::sync::oneshot;

        info!("Starting local OAuth callback server on {}", CALLBACK_ADDR);

        let listener = TcpListener::bind(CALLBACK_ADDR)
            .await
            .with_context(|| format!("Failed to bind callback server to {}", CALLBACK_ADDR))?;

        let (tx, rx) = oneshot::channel::<CallbackParams>();
        let tx = std::sync::Arc::new(tokio::sync::Mutex::new(Some(tx)));

        // Accept a single connection
        let (stream, _addr) = listener
            .accept()
            .await
            .context("Failed to accept connection on callback server")?;

        let io = TokioIo::new(stream);
        let tx_clone = tx.clone();

        let service = service_fn(move |req: Request<hyper::body::Incoming>| {
            let tx_inner = tx_clone.clone();
            async move {
                let uri = req.uri().to_string();
                debug!("Callback server received request: {}", uri);

                match parse_callback_params(&uri) {
                    Some(callback_params) => {
                        if let Some(sender) = tx_inner.lock().await.take() {
                            let _ = sender.send(callback_params);
                        }

                        let html = success_html();
                        Ok::<_, hyper::Error>(
                            Response::builder()
                                .status(StatusCode::OK)
                                .header("Content-Type", "text/html; charset=utf-8")
                                .body(Full::new(Bytes::from(html)))
                                .unwrap(),
                        )
                    }
                    None => {
                        let html = error_html("Missing authorization code in callback");
                        Ok(Response::builder()
                            .status(StatusCode::BAD_REQUEST)
                            .header("Content-Type", "text/html; charset=utf-8")
                            .body(Full::new(Bytes::from(html)))
                            .unwrap())
                    }
                }
            }
        });

        // Serve the single connection
        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!("Callback server connection error: {}", e);
            }
        });

        // Wait for the callback parameters
        let params = rx
            .await
            .context("Callback server channel closed without receiving parameters")?;

        info!("Received OAuth callback with authorization code");
        Ok(params)
    }
}

/// Parses the authorization code and state from a callback URI
fn parse_callback_params(uri: &str) -> Option<CallbackParams> {
    let url = url::Url::parse(&format!("http://localhost{}", uri)).ok()?;
    let mut code = None;
    let mut state = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            _ => {}
        }
    }

    Some(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    })
}

/// Returns the HTML for a successful authorization page
fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>SkySync - Authorization Successful</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Successful</h1>
    <p>SkySync is now connected to Google Drive.</p>
    <p>You can close this window.</p>
    <script>setTimeout(function() { window.close(); }, 3000);</script>
</body>
</html>"#
        .to_string()
}

/// Returns the HTML for an authorization error page
fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>SkySync - Authorization Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Error</h1>
    <p>{}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#,
        message
    )
}

// ============================================================================
// DriveAuthAdapter
// ============================================================================

/// High-level authorization adapter that orchestrates the full OAuth2 flow.
///
/// Combines [`AuthFlow`], [`LocalCallbackServer`], and browser launching to
/// provide a complete interactive authorization experience:
///
/// Rejects a callback whose state does not match the issued CSRF token
///
/// The authorization code in a forged or replayed redirect must never be
/// exchanged.
fn verify_state(expected: &CsrfToken, received: &str) -> Result<()> {
    if expected.secret() != received {
        anyhow::bail!("Authorization callback state mismatch, rejecting the response");
    }
    Ok(())
}

/// 1. Generates a PKCE-secured authorization URL
/// 2. Opens the user's browser to the Google consent page
/// 3. Starts a local callback server to receive the redirect
/// 4. Exchanges the authorization code for tokens
pub struct DriveAuthAdapter {
    client_secret_path: PathBuf,
}

impl DriveAuthAdapter {
    /// Creates an adapter reading credentials from the given
    /// `client_secret.json` path
    pub fn new(client_secret_path: PathBuf) -> Self {
        Self { client_secret_path }
    }

    /// Performs the full interactive OAuth2 login flow
    ///
    /// # Returns
    /// OAuth tokens on successful authorization
    pub async fn login(&self) -> Result<Tokens> {
        info!(provider = %ProviderKind::GoogleDrive, "Starting OAuth2 login flow");

        let secret = ClientSecret::load(&self.client_secret_path)
            .map_err(|e| anyhow::anyhow!(e).context("Cannot start interactive authorization"))?;
        let flow = AuthFlow::new(&secret)?;

        let (auth_url, csrf_token, pkce_verifier) = flow.generate_auth_url();

        info!("Opening browser for authorization");
        webbrowser::open(&auth_url).context("Failed to open browser for authorization")?;

        let callback = LocalCallbackServer::start().await?;
        verify_state(&csrf_token, &callback.state)?;

        let tokens = flow.exchange_code(callback.code, pkce_verifier).await?;

        info!("OAuth2 login completed successfully");
        Ok(tokens)
    }

    /// Refreshes an expired access token
    ///
    /// # Returns
    /// New OAuth tokens
    pub async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        let secret = ClientSecret::load(&self.client_secret_path)
            .map_err(|e| anyhow::anyhow!(e).context("Cannot refresh tokens"))?;
        let flow = AuthFlow::new(&secret)?;
        flow.refresh_token(refresh_token).await
    }
}
