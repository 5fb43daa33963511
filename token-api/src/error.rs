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

//! Application error type that implements Axum's `IntoResponse`.
//!
//! Every error is returned as `{"error": "<message>"}`, paired with the
//! appropriate HTTP status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use keyhunt_types::TokenErrorBody;

/// Application-level error that pairs an HTTP status code with a
/// [`TokenErrorBody`].
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub body: TokenErrorBody,
}

impl AppError {
    pub fn new(status: StatusCode, body: TokenErrorBody) -> Self {
        Self { status, body }
    }

    pub fn channel_required() -> Self {
        Self::new(StatusCode::BAD_REQUEST, TokenErrorBody::channel_required())
    }

    pub fn invalid_uid(uid: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, TokenErrorBody::invalid_uid(uid))
    }

    pub fn credentials_missing() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            TokenErrorBody::credentials_missing(),
        )
    }

    pub fn token_generation_failed() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            TokenErrorBody::token_generation_failed(),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
