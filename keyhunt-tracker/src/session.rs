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

//! A running tracking session: one detect task and one render task sharing
//! a mutex-guarded [`TrackingState`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_broadcast::{InactiveReceiver, Receiver, Sender};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::RenderBackend;
use crate::binder::SceneTransform;
use crate::config::TrackerConfig;
use crate::detection::{Detection, DetectionPipeline, MarkerDetector};
use crate::error::TrackerError;
use crate::events::TrackingEvent;
use crate::frame::{FrameSampler, FrameSource};
use crate::geometry::MarkerId;
use crate::pose::PoseEstimator;
use crate::riddles::{Riddle, RiddleBook};
use crate::state::TrackingState;
use crate::timer::IntervalHandle;

const EVENT_CAPACITY: usize = 256;

/// Collaborators a session is built from.
pub struct SessionParts {
    pub source: Box<dyn FrameSource>,
    pub detector: Box<dyn MarkerDetector>,
    /// Defaults to [`CoplanarPosit`](crate::posit::CoplanarPosit).
    pub estimator: Option<Box<dyn PoseEstimator>>,
    pub backend: Box<dyn RenderBackend>,
    pub riddles: RiddleBook,
}

struct BackendSlot {
    backend: Box<dyn RenderBackend>,
    disposed: bool,
}

#[derive(Clone, Copy, Default)]
struct Pushed {
    visible: Option<bool>,
    transform: Option<SceneTransform>,
}

pub struct TrackingSession {
    id: String,
    started: Instant,
    state: Arc<Mutex<TrackingState>>,
    backend: Arc<Mutex<BackendSlot>>,
    events: Sender<TrackingEvent>,
    _events_keepalive: InactiveReceiver<TrackingEvent>,
    detect_task: IntervalHandle,
    render_task: IntervalHandle,
}

impl TrackingSession {
    /// Spawn the detect and render tasks. Needs a tokio runtime.
    pub fn start(
        id: impl Into<String>,
        config: &TrackerConfig,
        parts: SessionParts,
    ) -> Result<Self, TrackerError> {
        config.validate()?;
        let id = id.into();
        let started = Instant::now();
        let state = Arc::new(Mutex::new(TrackingState::new(config, parts.riddles)));
        let backend = Arc::new(Mutex::new(BackendSlot {
            backend: parts.backend,
            disposed: false,
        }));

        let (mut events, receiver) = async_broadcast::broadcast(EVENT_CAPACITY);
        events.set_overflow(true);
        let events_keepalive = receiver.deactivate();

        // Sampling, decoding and pose solving run on the blocking pool. State
        // is only touched back on the runtime, after the worker returns.
        let detect_task = {
            let worker = Arc::new(Mutex::new(DetectWorker {
                sampler: FrameSampler::new(parts.source),
                pipeline: match parts.estimator {
                    Some(estimator) => DetectionPipeline::new(parts.detector, estimator),
                    None => DetectionPipeline::with_posit(parts.detector, config.marker_size_mm),
                },
            }));
            let state = state.clone();
            let events = events.clone();
            let id: Arc<str> = Arc::from(id.as_str());
            IntervalHandle::with_async(config.poll_interval(), move || {
                let worker = worker.clone();
                let state = state.clone();
                let events = events.clone();
                let id = id.clone();
                async move {
                    let now_ms = started.elapsed().as_millis() as u64;
                    let result = tokio::task::spawn_blocking(move || lock(&worker).detect())
                        .await
                        .unwrap_or_else(|e| {
                            Err(TrackerError::Detection(format!("detection worker failed: {e}")))
                        });
                    let emitted = match result {
                        Ok(None) => return,
                        Ok(Some((detections, width, height))) => {
                            lock(&state).apply_poll(&detections, width, height, now_ms)
                        }
                        Err(e) => {
                            warn!(session = %id, "detection tick abandoned: {e}");
                            vec![TrackingEvent::TickFailed {
                                reason: e.to_string(),
                            }]
                        }
                    };
                    publish(&events, emitted);
                }
            })
        };

        let render_task = {
            let state = state.clone();
            let backend = backend.clone();
            let mut pushed = BTreeMap::new();
            IntervalHandle::new(config.render_interval(), move || {
                let frame: Vec<(MarkerId, bool, Option<SceneTransform>)> = lock(&state)
                    .keys()
                    .map(|k| (k.marker_id(), k.is_visible(), k.transform().copied()))
                    .collect();
                let mut slot = lock(&backend);
                if slot.disposed {
                    return;
                }
                push_changes(slot.backend.as_mut(), &mut pushed, frame);
            })
        };

        info!(session = %id, "tracking session started");
        Ok(Self {
            id,
            started,
            state,
            backend,
            events,
            _events_keepalive: events_keepalive,
            detect_task,
            render_task,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Milliseconds since the session started, on the clock polls are
    /// stamped with.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> Receiver<TrackingEvent> {
        self.events.new_receiver()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&TrackingState) -> R) -> R {
        f(&lock(&self.state))
    }

    pub fn open_riddle(&self) -> Option<(MarkerId, Riddle)> {
        self.with_state(|state| {
            state
                .open_riddle()
                .map(|(marker_id, riddle)| (marker_id, riddle.clone()))
        })
    }

    /// Answer the targeted key's riddle; `true` if the key was collected.
    pub fn answer(&self, marker_id: MarkerId, index: usize) -> Result<bool, TrackerError> {
        let outcome = lock(&self.state).answer(marker_id, index)?;
        publish(&self.events, outcome.events);
        Ok(outcome.correct)
    }

    /// Stop both tasks and dispose the backend. Safe to call twice.
    pub fn shutdown(&mut self) {
        self.detect_task.cancel();
        self.render_task.cancel();
        let mut slot = lock(&self.backend);
        if !slot.disposed {
            slot.backend.dispose();
            slot.disposed = true;
            info!(session = %self.id, "tracking session stopped");
        }
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct DetectWorker {
    sampler: FrameSampler,
    pipeline: DetectionPipeline,
}

impl DetectWorker {
    /// Sample and detect one frame. `Ok(None)` when the source is not ready.
    fn detect(&mut self) -> Result<Option<(Vec<Detection>, u32, u32)>, TrackerError> {
        let Some(frame) = self.sampler.sample()? else {
            return Ok(None);
        };
        let detections = self.pipeline.process(frame)?;
        Ok(Some((detections, frame.width, frame.height)))
    }
}

/// Push what changed since the previous render frame. A transform is only
/// pushed for a visible key, before its visibility.
fn push_changes(
    backend: &mut dyn RenderBackend,
    pushed: &mut BTreeMap<MarkerId, Pushed>,
    frame: Vec<(MarkerId, bool, Option<SceneTransform>)>,
) {
    for (marker_id, visible, transform) in frame {
        let last = pushed.entry(marker_id).or_default();
        if visible {
            if let Some(transform) = transform {
                if last.transform != Some(transform) {
                    backend.set_transform(marker_id, &transform);
                    last.transform = Some(transform);
                }
            }
        }
        if last.visible != Some(visible) {
            debug!(marker = marker_id, visible, "render visibility change");
            backend.set_visible(marker_id, visible);
            last.visible = Some(visible);
        }
    }
}

fn publish(events: &Sender<TrackingEvent>, emitted: Vec<TrackingEvent>) {
    for event in emitted {
        let _ = events.try_broadcast(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use nalgebra::{Point3, UnitQuaternion};

    fn at(z: f64) -> SceneTransform {
        SceneTransform {
            position: Point3::new(0.0, 0.0, z),
            orientation: UnitQuaternion::identity(),
            scale: 1.0,
            fit_scale: 1.0,
        }
    }

    #[test]
    fn only_changes_are_pushed() {
        let recording = RecordingBackend::new();
        let mut backend = recording.clone();
        let mut pushed = BTreeMap::new();

        push_changes(&mut backend, &mut pushed, vec![(42, false, None), (63, true, Some(at(-1.0)))]);
        let first = recording.snapshot();
        assert_eq!((first.transform_updates, first.visibility_updates), (1, 2));

        push_changes(&mut backend, &mut pushed, vec![(42, false, None), (63, true, Some(at(-1.0)))]);
        assert_eq!(recording.snapshot(), first);

        push_changes(&mut backend, &mut pushed, vec![(42, false, None), (63, true, Some(at(-1.5)))]);
        let moved = recording.snapshot();
        assert_eq!((moved.transform_updates, moved.visibility_updates), (2, 2));
        assert_eq!(moved.transforms[&63].position.z, -1.5);
    }

    #[test]
    fn hidden_key_keeps_its_last_pushed_transform() {
        let recording = RecordingBackend::new();
        let mut backend = recording.clone();
        let mut pushed = BTreeMap::new();

        push_changes(&mut backend, &mut pushed, vec![(42, true, Some(at(-1.0)))]);
        push_changes(&mut backend, &mut pushed, vec![(42, false, Some(at(-2.0)))]);
        let hidden = recording.snapshot();
        assert!(!hidden.is_visible(42));
        assert_eq!(hidden.transforms[&42].position.z, -1.0);
        assert_eq!(hidden.transform_updates, 1);
    }
}
