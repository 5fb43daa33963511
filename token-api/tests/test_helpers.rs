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

#![allow(dead_code)]

use std::path::PathBuf;

use axum::http;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use token_api::config::{Config, Credentials};

pub const TEST_APP_ID: &str = "test-app-id";
pub const TEST_APP_CERTIFICATE: &str = "test-certificate-for-integration-tests";
pub const TEST_TOKEN_TTL: i64 = 3600;
pub const DEV_ORIGIN: &str = "http://localhost:5173";

pub fn test_config() -> Config {
    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        credentials: Some(Credentials {
            app_id: TEST_APP_ID.to_string(),
            app_certificate: TEST_APP_CERTIFICATE.to_string(),
        }),
        token_ttl_secs: TEST_TOKEN_TTL,
        static_dir: None,
        cors_origins: vec![DEV_ORIGIN.to_string()],
    }
}

/// Build the full app, ready for `tower::ServiceExt::oneshot`.
pub fn build_app() -> Router {
    token_api::app(&test_config())
}

pub fn build_app_without_credentials() -> Router {
    token_api::app(&Config {
        credentials: None,
        ..test_config()
    })
}

pub fn build_app_with_static(dir: PathBuf) -> Router {
    token_api::app(&Config {
        static_dir: Some(dir),
        ..test_config()
    })
}

pub fn get(uri: &str) -> http::request::Builder {
    http::Request::builder().method("GET").uri(uri)
}

/// Consume a response body and deserialize JSON into `T`.
pub async fn response_json<T: DeserializeOwned>(resp: Response) -> T {
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("deserialize response body")
}

pub async fn response_text(resp: Response) -> String {
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
