//! Spotify client-credential exchange with a cached, single-flight bearer token

use std::collections::HashSet;

use chrono::{TimeDelta, Utc};
use rspotify::Token;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::SpotifyCredentials;
use crate::sources::FetchError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Caches the bearer token until expiry.
///
/// The lock is held across the exchange request, so concurrent callers that
/// find no valid token wait for the one in-progress acquisition instead of
/// issuing their own.
pub struct CredentialCache {
    http: reqwest::Client,
    auth_url: String,
    credentials: Option<SpotifyCredentials>,
    token: Mutex<Option<Token>>,
}

impl CredentialCache {
    pub fn new(http: reqwest::Client, auth_url: String, credentials: Option<SpotifyCredentials>) -> Self {
        Self {
            http,
            auth_url,
            credentials,
            token: Mutex::new(None),
        }
    }

    /// Current access token, acquiring a fresh one if missing or expired
    pub async fn bearer(&self) -> Result<String, FetchError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.access_token.clone());
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token so the next call re-acquires it
    pub async fn invalidate(&self) {
        tracing::debug!("Invalidating cached Spotify token");
        *self.token.lock().await = None;
    }

    async fn request_token(&self) -> Result<Token, FetchError> {
        let creds = self.credentials.as_ref().ok_or(FetchError::MissingCredentials)?;

        tracing::info!("Requesting Spotify client-credential token");
        let response = self
            .http
            .post(&self.auth_url)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let body: TokenResponse = crate::sources::decode(response).await?;

        let expires_in = TimeDelta::try_seconds(body.expires_in)
            .filter(|lifetime| *lifetime >= TimeDelta::zero())
            .ok_or(FetchError::InvalidToken(body.expires_in))?;
        let expires_at = Utc::now()
            .checked_add_signed(expires_in)
            .ok_or(FetchError::InvalidToken(body.expires_in))?;
        tracing::debug!(expires_in_secs = body.expires_in, "Spotify token acquired");

        Ok(Token {
            access_token: body.access_token,
            expires_in,
            expires_at: Some(expires_at),
            scopes: HashSet::new(),
            refresh_token: None,
        })
    }
}
