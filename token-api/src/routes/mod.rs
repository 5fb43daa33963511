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

pub mod token;

use axum::{middleware, routing::get, Router};

use crate::state::AppState;

/// Build the application router with the token route.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/token",
        get(token::get_token).layer(middleware::from_fn(token::no_cache)),
    )
}
