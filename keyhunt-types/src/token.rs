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

//! Channel access token (JWT) claims.
//!
//! The token service signs these claims with the application certificate
//! (HMAC-SHA256); the streaming edge validates the signature before letting
//! a client publish or subscribe.

use serde::{Deserialize, Serialize};

use crate::requests::Role;

/// JWT payload for a channel access token.
///
/// # Example payload
///
/// ```json
/// {
///   "app_id": "598a5efd",
///   "channel": "robot-arena",
///   "uid": 4242,
///   "role": "publisher",
///   "iat": 1707001200,
///   "exp": 1707004800,
///   "iss": "keyhunt-token-api"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChannelTokenClaims {
    /// Application the channel belongs to.
    pub app_id: String,

    /// Channel the holder may join.
    pub channel: String,

    /// Numeric user id bound to the token.
    pub uid: u32,

    pub role: Role,

    /// Issued-at timestamp (Unix seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix seconds).
    pub exp: i64,

    /// Always [`ChannelTokenClaims::ISSUER`].
    pub iss: String,
}

impl ChannelTokenClaims {
    pub const ISSUER: &'static str = "keyhunt-token-api";
}
