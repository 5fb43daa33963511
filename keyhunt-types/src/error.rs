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

//! Error body returned by the token endpoint.
//!
//! Every failed request answers with `{"error": "<message>"}` and a 4xx/5xx
//! status code.

use serde::{Deserialize, Serialize};

/// JSON body of a failed token request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenErrorBody {
    /// Human-readable error message.
    pub error: String,
}

impl TokenErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    pub fn channel_required() -> Self {
        Self::new("Channel name is required")
    }

    pub fn invalid_uid(uid: &str) -> Self {
        Self::new(format!("Invalid uid '{uid}': must be a non-negative integer"))
    }

    pub fn credentials_missing() -> Self {
        Self::new("Server credentials missing")
    }

    pub fn token_generation_failed() -> Self {
        Self::new("Failed to generate token")
    }
}

impl std::fmt::Display for TokenErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error)
    }
}

impl std::error::Error for TokenErrorBody {}
