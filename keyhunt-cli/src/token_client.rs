/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Client for the channel token service.
//!
//! Any failure to obtain a token is logged and answered with a development
//! fallback token so a local session can still start.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use keyhunt_types::TokenErrorBody;
use reqwest::Client;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

/// Handed out when the service cannot be reached or refuses the request.
pub const DEV_FALLBACK_TOKEN: &str = "keyhunt-dev-token";

/// Assumed lifetime when the service does not say.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// How long before expiry a token is refreshed.
pub const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum TokenClientError {
    #[error("Invalid token url: {0}")]
    Url(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Token server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("Token not found in response")]
    MissingToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in seconds as reported by the service.
    pub expires_in: Option<i64>,
    /// True when this is [`DEV_FALLBACK_TOKEN`] rather than a service token.
    pub fallback: bool,
}

impl IssuedToken {
    fn fallback(token: &str) -> Self {
        Self {
            token: token.to_string(),
            expires_in: None,
            fallback: true,
        }
    }

    /// Time until this token should be replaced.
    pub fn refresh_delay(&self) -> Duration {
        refresh_delay(self.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS))
    }
}

/// `ttl - 60 s`, but never less than a second.
pub fn refresh_delay(ttl_secs: i64) -> Duration {
    Duration::from_secs((ttl_secs - REFRESH_MARGIN_SECS).max(1) as u64)
}

#[derive(Debug, Clone)]
pub struct TokenClient {
    base_url: Url,
    http: Client,
    fallback_token: String,
}

impl TokenClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http: Client::new(),
            fallback_token: DEV_FALLBACK_TOKEN.to_string(),
        }
    }

    pub fn with_fallback_token(mut self, token: impl Into<String>) -> Self {
        self.fallback_token = token.into();
        self
    }

    /// `<base>/token?channelName=..&uid=..&role=..`
    pub fn token_url(
        &self,
        channel: &str,
        uid: Option<u32>,
        role: &str,
    ) -> Result<Url, TokenClientError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut url = base.join("token")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("channelName", channel);
            if let Some(uid) = uid {
                query.append_pair("uid", &uid.to_string());
            }
            query.append_pair("role", role);
        }
        Ok(url)
    }

    /// Ask the service for a token, surfacing every failure.
    pub async fn request(
        &self,
        channel: &str,
        uid: Option<u32>,
        role: &str,
    ) -> Result<IssuedToken, TokenClientError> {
        let url = self.token_url(channel, uid, role)?;
        info!("Requesting token for channel: {channel}, uid: {uid:?}, role: {role}");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<TokenErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(TokenClientError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let body: serde_json::Value = response.json().await?;
        let token = body
            .get("token")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .ok_or(TokenClientError::MissingToken)?;
        Ok(IssuedToken {
            token: token.to_string(),
            expires_in: body.get("expiresIn").and_then(|e| e.as_i64()),
            fallback: false,
        })
    }

    /// Like [`TokenClient::request`], but falls back to the development
    /// token on any failure.
    pub async fn fetch_token(&self, channel: &str, uid: Option<u32>, role: &str) -> IssuedToken {
        match self.request(channel, uid, role).await {
            Ok(token) => {
                info!("Successfully obtained token");
                token
            }
            Err(e) => {
                warn!("Error fetching token: {e}, using development fallback token");
                IssuedToken::fallback(&self.fallback_token)
            }
        }
    }
}

/// Keeps a channel token fresh in the background until dropped.
pub struct TokenRefresher {
    current: Arc<Mutex<IssuedToken>>,
    refreshes: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl TokenRefresher {
    /// Fetch a first token, then refresh it [`REFRESH_MARGIN_SECS`] before
    /// each expiry.
    pub async fn start(client: TokenClient, channel: String, uid: Option<u32>, role: String) -> Self {
        let first = client.fetch_token(&channel, uid, &role).await;
        let current = Arc::new(Mutex::new(first));
        let refreshes = Arc::new(AtomicUsize::new(0));

        let task = {
            let current = current.clone();
            let refreshes = refreshes.clone();
            tokio::spawn(async move {
                loop {
                    let delay = current
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .refresh_delay();
                    tokio::time::sleep(delay).await;
                    info!("Token about to expire, refreshing...");
                    let next = client.fetch_token(&channel, uid, &role).await;
                    *current.lock().unwrap_or_else(PoisonError::into_inner) = next;
                    refreshes.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        Self {
            current,
            refreshes,
            task,
        }
    }

    pub fn current(&self) -> IssuedToken {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for TokenRefresher {
    fn drop(&mut self) {
        self.cancel();
    }
}
