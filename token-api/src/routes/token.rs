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

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
    Json,
};
use keyhunt_types::{Role, TokenQuery, TokenResponse};

use crate::error::AppError;
use crate::state::AppState;
use crate::token::{generate_channel_token, resolve_uid};

/// GET /token?channelName=..&uid=..&role=..
///
/// `role=host` receives a publisher token, anything else a subscriber token.
/// A random uid is assigned when none is given.
pub async fn get_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenResponse>, AppError> {
    let channel = query
        .channel_name
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(AppError::channel_required)?;

    let credentials = state.credentials.as_ref().ok_or_else(|| {
        tracing::error!("Token requested but APP_ID/APP_CERTIFICATE are not configured");
        AppError::credentials_missing()
    })?;

    let uid = resolve_uid(query.uid.as_deref())?;
    let role = Role::from_query(query.role.as_deref());
    let token = generate_channel_token(credentials, state.token_ttl_secs, channel, uid, role)?;

    tracing::info!("Issued {role:?} token for channel {channel} uid {uid}");

    Ok(Json(TokenResponse {
        token,
        expires_in: state.token_ttl_secs,
    }))
}

/// Mark every token response, errors included, as uncacheable.
pub async fn no_cache(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::EXPIRES, HeaderValue::from_static("-1"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}
