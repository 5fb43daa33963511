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

//! Registry of running tracking sessions keyed by session or user id.

use std::collections::HashMap;

use tracing::info;

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::session::{SessionParts, TrackingSession};

#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, TrackingSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session under `id`. Fails if one is already running.
    pub fn create(
        &mut self,
        id: impl Into<String>,
        config: &TrackerConfig,
        parts: SessionParts,
    ) -> Result<&TrackingSession, TrackerError> {
        let id = id.into();
        if self.sessions.contains_key(&id) {
            return Err(TrackerError::DuplicateSession(id));
        }
        let session = TrackingSession::start(id.clone(), config, parts)?;
        Ok(self.sessions.entry(id).or_insert(session))
    }

    pub fn get(&self, id: &str) -> Option<&TrackingSession> {
        self.sessions.get(id)
    }

    /// Stop the session's tasks, dispose its renderables and forget it.
    pub fn destroy(&mut self, id: &str) -> Result<(), TrackerError> {
        let mut session = self
            .sessions
            .remove(id)
            .ok_or_else(|| TrackerError::UnknownSession(id.to_string()))?;
        session.shutdown();
        Ok(())
    }

    pub fn destroy_all(&mut self) {
        let count = self.sessions.len();
        for (_, mut session) in self.sessions.drain() {
            session.shutdown();
        }
        if count > 0 {
            info!("destroyed {count} tracking sessions");
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
