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


//! Command line front end for the key hunt tracker: scripted replays through
//! a live tracking session, and channel tokens from the token service.

pub mod cli_args;
pub mod consumers;
pub mod modes;
pub mod producers;
pub mod token_client;
