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

use keyhunt_tracker::{
    MarkerId, RecordingBackend, RenderBackend, SceneTransform, TracingBackend,
};

pub mod report;

/// Render sink for a replay: always records, optionally logs as well.
pub struct ReplayBackend {
    recording: RecordingBackend,
    tracing: Option<TracingBackend>,
}

impl ReplayBackend {
    pub fn new(recording: RecordingBackend, tracing: Option<TracingBackend>) -> Self {
        Self { recording, tracing }
    }
}

impl RenderBackend for ReplayBackend {
    fn set_transform(&mut self, marker_id: MarkerId, transform: &SceneTransform) {
        self.recording.set_transform(marker_id, transform);
        if let Some(tracing) = self.tracing.as_mut() {
            tracing.set_transform(marker_id, transform);
        }
    }

    fn set_visible(&mut self, marker_id: MarkerId, visible: bool) {
        self.recording.set_visible(marker_id, visible);
        if let Some(tracing) = self.tracing.as_mut() {
            tracing.set_visible(marker_id, visible);
        }
    }

    fn dispose(&mut self) {
        self.recording.dispose();
        if let Some(tracing) = self.tracing.as_mut() {
            tracing.dispose();
        }
    }
}
