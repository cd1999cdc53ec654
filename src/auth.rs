//! Clients for the external auth collaborators.
//!
//! The streaming protocol authenticates via the ambient session cookie
//! established here, so the cookie jar is shared between the HTTP
//! client and the websocket connect request.

use anyhow::{Context, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::error::SessionError;

/// Response of the session-identity check endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SessionIdentity {
    pub logged_in: bool,
    #[serde(default)]
    pub user: Option<String>,
}

pub struct AuthClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            jar,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Check whether a session identity is established.
    pub async fn session_check(&self) -> Result<SessionIdentity> {
        let url = format!("{}/api/session_check", self.base_url);

        let identity: SessionIdentity = self
            .http
            .get(&url)
            .send()
            .await
            .context("Session check request failed")?
            .error_for_status()
            .context("Session check rejected")?
            .json()
            .await
            .context("Failed to parse session check response")?;

        Ok(identity)
    }

    /// Session check that the streaming connect path requires to pass.
    pub async fn verify_identity(&self) -> Result<SessionIdentity, SessionError> {
        match self.session_check().await {
            Ok(identity) if identity.logged_in => {
                info!(
                    "Session identity verified: {}",
                    identity.user.as_deref().unwrap_or("unknown")
                );
                Ok(identity)
            }
            Ok(_) => Err(SessionError::NotAuthenticated),
            Err(e) => {
                tracing::warn!("Session check failed: {}", e);
                Err(SessionError::NotAuthenticated)
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let url = format!("{}/login", self.base_url);

        self.http
            .post(&url)
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .context("Login request failed")?
            .error_for_status()
            .context("Login rejected")?;

        info!("Logged in as {}", email);
        Ok(())
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<()> {
        let url = format!("{}/register", self.base_url);

        self.http
            .post(&url)
            .form(&[("name", name), ("email", email), ("password", password)])
            .send()
            .await
            .context("Registration request failed")?
            .error_for_status()
            .context("Registration rejected")?;

        info!("Registered account for {}", email);
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        let url = format!("{}/logout", self.base_url);

        self.http
            .get(&url)
            .send()
            .await
            .context("Logout request failed")?;

        info!("Logged out");
        Ok(())
    }

    /// Session cookie header for the websocket connect request, if any.
    pub fn session_cookie(&self) -> Option<HeaderValue> {
        let url = self.base_url.parse().ok()?;
        self.jar.cookies(&url)
    }

    /// HTTP client sharing this session's cookie jar.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}
