//! OAuth2 (PKCE) login and token storage.
//!
//! The data source only ever asks a [`TokenStorage`] for the current token.
//! [`AuthService`] drives the login: build the authorization URL, hand it to
//! a [`BrowserLauncher`], exchange the returned code, and store the token.

use crate::api::mal::{OAuthApi, TokenResponse};
use crate::error::DataSourceError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::distributions::{Alphanumeric, Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Length of the PKCE code verifier (RFC 7636 allows 43-128)
const VERIFIER_LEN: usize = 128;

const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Bearer token for the primary API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type,
            expires_at: response.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }

    /// Tokens without an expiry never expire
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Where the current access token lives
#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn get_access_token(&self) -> Option<AccessToken>;

    async fn set_access_token(&self, token: AccessToken) -> Result<()>;

    async fn clear_access_token(&self) -> Result<()>;
}

/// Process-local token storage
#[derive(Debug, Default)]
pub struct InMemoryTokenStorage {
    token: RwLock<Option<AccessToken>>,
}

impl InMemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

#[async_trait]
impl TokenStorage for InMemoryTokenStorage {
    async fn get_access_token(&self) -> Option<AccessToken> {
        self.token.read().await.clone()
    }

    async fn set_access_token(&self, token: AccessToken) -> Result<()> {
        *self.token.write().await = Some(token);
        Ok(())
    }

    async fn clear_access_token(&self) -> Result<()> {
        *self.token.write().await = None;
        Ok(())
    }
}

/// Token storage backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn get_access_token(&self) -> Option<AccessToken> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No stored token");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable token file");
                None
            }
        }
    }

    async fn set_access_token(&self, token: AccessToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create token directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(&token).context("Failed to serialize token")?;
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write token file: {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Token stored");
        Ok(())
    }

    async fn clear_access_token(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to remove token file: {}", self.path.display()))),
        }
    }
}

/// PKCE verifier/challenge pair.
///
/// MAL only implements the `plain` method, so the challenge is the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        let charset = Uniform::from(0..UNRESERVED.len());
        let mut rng = rand::thread_rng();
        let verifier: String = (0..VERIFIER_LEN)
            .map(|_| UNRESERVED[charset.sample(&mut rng)] as char)
            .collect();

        Self {
            challenge: verifier.clone(),
            verifier,
        }
    }
}

/// Opens an authorization URL for the user
pub trait BrowserLauncher: Send + Sync {
    fn launch(&self, url: &str) -> Result<()>;
}

/// Prints the URL for the user to open by hand
#[derive(Debug, Default)]
pub struct StdoutLauncher;

impl BrowserLauncher for StdoutLauncher {
    fn launch(&self, url: &str) -> Result<()> {
        println!("Open this URL in your browser to log in:\n\n  {}\n", url);
        Ok(())
    }
}

/// A login waiting for its authorization code
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub pkce: PkceChallenge,
    pub state: String,
    pub url: String,
}

/// Drives the PKCE login and keeps the stored token fresh
pub struct AuthService {
    oauth: Arc<dyn OAuthApi>,
    storage: Arc<dyn TokenStorage>,
    launcher: Arc<dyn BrowserLauncher>,
}

impl AuthService {
    pub fn new(
        oauth: Arc<dyn OAuthApi>,
        storage: Arc<dyn TokenStorage>,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Self {
        Self {
            oauth,
            storage,
            launcher,
        }
    }

    /// Generate a challenge and launch the authorization URL
    pub fn begin_login(&self) -> Result<PendingLogin> {
        let pkce = PkceChallenge::generate();
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        let url = self.oauth.authorize_url(&pkce.challenge, &state);

        self.launcher
            .launch(&url)
            .context("Failed to launch authorization URL")?;
        info!("Authorization URL launched");

        Ok(PendingLogin { pkce, state, url })
    }

    /// Exchange the authorization code and store the resulting token.
    ///
    /// `returned_state`, when the redirect carried one, must match the
    /// state sent with the authorization URL.
    pub async fn complete_login(
        &self,
        pending: &PendingLogin,
        code: &str,
        returned_state: Option<&str>,
    ) -> Result<AccessToken, DataSourceError> {
        if returned_state.is_some_and(|state| state != pending.state) {
            warn!("Authorization state mismatch");
            return Err(DataSourceError::Unauthorized);
        }

        let response = self
            .oauth
            .exchange_code(code, &pending.pkce.verifier)
            .await?;
        let token = AccessToken::from_response(response, Utc::now());
        self.store(token.clone()).await?;

        info!("Login complete");
        Ok(token)
    }

    /// The stored token, refreshed first if it has expired.
    ///
    /// `None` when there is no token or it expired and cannot be refreshed.
    pub async fn valid_token(&self) -> Option<AccessToken> {
        let token = self.storage.get_access_token().await?;
        if !token.is_expired(Utc::now()) {
            return Some(token);
        }

        let refresh_token = token.refresh_token?;
        match self.oauth.refresh_token(&refresh_token).await {
            Ok(response) => {
                let mut refreshed = AccessToken::from_response(response, Utc::now());
                // Keep the old refresh token unless a new one was issued
                refreshed.refresh_token.get_or_insert(refresh_token);
                if let Err(e) = self.store(refreshed.clone()).await {
                    warn!(error = %e, "Failed to store refreshed token");
                }
                info!("Access token refreshed");
                Some(refreshed)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                None
            }
        }
    }

    pub async fn logout(&self) -> Result<()> {
        self.storage.clear_access_token().await?;
        info!("Logged out");
        Ok(())
    }

    async fn store(&self, token: AccessToken) -> Result<(), DataSourceError> {
        self.storage
            .set_access_token(token)
            .await
            .map_err(|e| DataSourceError::Unknown {
                message: format!("Failed to store token: {:#}", e),
            })
    }
}
