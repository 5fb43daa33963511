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

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

/// Streaming application credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: String,
    /// Secret used to sign channel tokens (HMAC-SHA256).
    pub app_certificate: String,
}

/// Configuration for the token service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server (e.g. "0.0.0.0:8081").
    pub listen_addr: String,
    /// `None` if either `APP_ID` or `APP_CERTIFICATE` is unset or empty.
    pub credentials: Option<Credentials>,
    /// Token time-to-live in seconds (default: 3600 = 1 hour).
    pub token_ttl_secs: i64,
    /// Built web client to serve, with SPA fallback to `index.html`.
    pub static_dir: Option<PathBuf>,
    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Credentials
    /// - `APP_ID`, `APP_CERTIFICATE` (the binary refuses to start without them)
    ///
    /// # Optional
    /// - `LISTEN_ADDR` (default: `"0.0.0.0:8081"`)
    /// - `TOKEN_TTL_SECS` (default: `"3600"`)
    /// - `STATIC_DIR`
    /// - `CORS_ORIGINS` (comma separated, default: the local Vite dev server)
    pub fn from_env() -> Result<Self, String> {
        let credentials = match (non_empty("APP_ID"), non_empty("APP_CERTIFICATE")) {
            (Some(app_id), Some(app_certificate)) => Some(Credentials {
                app_id,
                app_certificate,
            }),
            _ => None,
        };

        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string());
        let token_ttl_secs = env::var("TOKEN_TTL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse::<i64>()
            .ok()
            .filter(|ttl| *ttl > 0)
            .ok_or("TOKEN_TTL_SECS must be a positive integer")?;
        let static_dir = non_empty("STATIC_DIR").map(PathBuf::from);
        let cors_origins = non_empty("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            listen_addr,
            credentials,
            token_ttl_secs,
            static_dir,
            cors_origins,
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}
