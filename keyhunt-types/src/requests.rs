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

//! Query parameters accepted by `GET /token`.

use serde::{Deserialize, Serialize};

/// Query string of `GET /token?channelName=..&uid=..&role=..`.
///
/// Every field is optional at the deserialization layer so the handler can
/// answer a missing channel with a 400 body instead of a framework rejection.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TokenQuery {
    #[serde(rename = "channelName", default)]
    pub channel_name: Option<String>,

    /// Numeric user id. A random one is assigned when absent or empty.
    #[serde(default)]
    pub uid: Option<String>,

    /// `"host"` publishes, anything else subscribes.
    #[serde(default)]
    pub role: Option<String>,
}

/// Streaming privilege granted by a token.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Publisher,
    Subscriber,
}

impl Role {
    /// Map the `role` query value onto a privilege.
    pub fn from_query(role: Option<&str>) -> Self {
        match role {
            Some("host") => Role::Publisher,
            _ => Role::Subscriber,
        }
    }
}
