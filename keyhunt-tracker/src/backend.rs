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

//! Render backends.
//!
//! The tracking loop drives a renderer only through [`RenderBackend`]. The
//! render task calls it with changes since its last frame.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::assets::KeyModel;
use crate::binder::SceneTransform;
use crate::geometry::MarkerId;

pub trait RenderBackend: Send {
    fn set_transform(&mut self, marker_id: MarkerId, transform: &SceneTransform);

    fn set_visible(&mut self, marker_id: MarkerId, visible: bool);

    /// Release every renderable. Called once on session teardown.
    fn dispose(&mut self);
}

/// Logs every change. Useful headless.
pub struct TracingBackend {
    model: KeyModel,
    session: String,
}

impl TracingBackend {
    pub fn new(session: impl Into<String>, model: KeyModel) -> Self {
        let session = session.into();
        info!(
            session = %session,
            placeholder = model.is_placeholder(),
            "tracing backend ready"
        );
        Self { model, session }
    }
}

impl RenderBackend for TracingBackend {
    fn set_transform(&mut self, marker_id: MarkerId, transform: &SceneTransform) {
        let p = transform.position;
        debug!(
            session = %self.session,
            marker = marker_id,
            "key at ({:.3}, {:.3}, {:.3}) scale {:.3}",
            p.x,
            p.y,
            p.z,
            transform.total_scale() * self.model.base_scale
        );
    }

    fn set_visible(&mut self, marker_id: MarkerId, visible: bool) {
        info!(session = %self.session, marker = marker_id, visible, "key visibility");
    }

    fn dispose(&mut self) {
        info!(session = %self.session, "disposing renderables");
    }
}

/// What a [`RecordingBackend`] has been told so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    pub transforms: BTreeMap<MarkerId, SceneTransform>,
    pub visible: BTreeMap<MarkerId, bool>,
    pub transform_updates: usize,
    pub visibility_updates: usize,
    pub disposed: bool,
}

impl Recording {
    pub fn is_visible(&self, marker_id: MarkerId) -> bool {
        self.visible.get(&marker_id).copied().unwrap_or(false)
    }
}

/// Keeps the last transform and visibility per key. Clones share the same
/// recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Recording {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RenderBackend for RecordingBackend {
    fn set_transform(&mut self, marker_id: MarkerId, transform: &SceneTransform) {
        let mut recording = self.lock();
        recording.transforms.insert(marker_id, *transform);
        recording.transform_updates += 1;
    }

    fn set_visible(&mut self, marker_id: MarkerId, visible: bool) {
        let mut recording = self.lock();
        recording.visible.insert(marker_id, visible);
        recording.visibility_updates += 1;
    }

    fn dispose(&mut self) {
        let mut recording = self.lock();
        recording.transforms.clear();
        recording.visible.clear();
        recording.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, UnitQuaternion};

    #[test]
    fn clones_share_the_recording() {
        let backend = RecordingBackend::new();
        let mut handle: Box<dyn RenderBackend> = Box::new(backend.clone());
        let transform = SceneTransform {
            position: Point3::new(0.0, 0.0, -1.0),
            orientation: UnitQuaternion::identity(),
            scale: 1.0,
            fit_scale: 1.0,
        };
        handle.set_transform(42, &transform);
        handle.set_visible(42, true);

        let recording = backend.snapshot();
        assert_eq!(recording.transforms[&42], transform);
        assert!(recording.is_visible(42));
        assert!(!recording.is_visible(63));

        handle.dispose();
        let recording = backend.snapshot();
        assert!(recording.disposed);
        assert!(recording.visible.is_empty());
    }
}
