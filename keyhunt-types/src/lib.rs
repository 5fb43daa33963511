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

//! Shared wire types for the key hunt token service.
//!
//! This crate defines the contract between the token endpoint and its
//! consumers (the CLI, browser clients, integration tests). It only depends
//! on serde.

pub mod error;
pub mod requests;
pub mod responses;
pub mod token;

pub use error::TokenErrorBody;
pub use requests::{Role, TokenQuery};
pub use responses::TokenResponse;
pub use token::ChannelTokenClaims;
