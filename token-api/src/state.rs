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

//! Shared application state passed to every Axum handler via `State`.

use crate::config::{Config, Credentials};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// `None` makes every token request fail with 500.
    pub credentials: Option<Credentials>,
    /// Token time-to-live in seconds.
    pub token_ttl_secs: i64,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            credentials: config.credentials.clone(),
            token_ttl_secs: config.token_ttl_secs,
        }
    }
}
