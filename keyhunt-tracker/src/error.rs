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

use thiserror::Error;

use crate::geometry::MarkerId;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("marker detection failed: {0}")]
    Detection(String),

    #[error("pose estimation failed: {0}")]
    Pose(String),

    #[error("asset load failed: {0}")]
    Asset(String),

    #[error("invalid tracker config: {0}")]
    InvalidConfig(String),

    #[error("session '{0}' already exists")]
    DuplicateSession(String),

    #[error("session '{0}' not found")]
    UnknownSession(String),

    #[error("no key is bound to marker {0}")]
    UnknownKey(MarkerId),

    #[error("key {0} is not targeted")]
    NotTargeted(MarkerId),

    #[error("riddle {0} not found")]
    UnknownRiddle(u32),

    #[error("riddle {riddle_id} has no answer {index}")]
    UnknownAnswer { riddle_id: u32, index: usize },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
