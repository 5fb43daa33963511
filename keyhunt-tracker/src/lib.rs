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

//! Marker tracking loop for the key hunt AR overlay.
//!
//! A tracking session polls a video source at a fixed cadence, runs marker
//! detection and pose estimation on the sampled frame, folds the result into
//! a [`TrackingState`](state::TrackingState) and binds each visible key to a
//! scene transform. A second task pushes the resulting transforms into a
//! [`RenderBackend`](backend::RenderBackend) at render cadence.
//!
//! ```text
//!  FrameSource ──► FrameSampler ──► DetectionPipeline ──► TrackingState ◄── render task ──► RenderBackend
//!                  (poll task)      (detector + pose)     (Arc<Mutex<_>>)
//! ```

pub mod assets;
pub mod backend;
pub mod binder;
pub mod config;
pub mod detection;
pub mod error;
pub mod events;
pub mod frame;
pub mod geometry;
pub mod pose;
pub mod posit;
pub mod registry;
pub mod riddles;
pub mod session;
pub mod state;
pub mod timer;

pub use assets::KeyModel;
pub use backend::{Recording, RecordingBackend, RenderBackend, TracingBackend};
pub use binder::{SceneTransform, TransformBinder};
pub use config::{CreationPolicy, KeySpec, OrientationMode, TrackerConfig};
pub use detection::{Detection, DetectionPipeline, MarkerDetector};
pub use error::TrackerError;
pub use events::TrackingEvent;
pub use frame::{FrameSampler, FrameSource, PixelBuffer, VideoStatus};
pub use geometry::{MarkerBounds, MarkerId, MarkerObservation};
pub use pose::{PoseEstimate, PoseEstimator, PoseSolution};
pub use posit::CoplanarPosit;
pub use registry::SessionRegistry;
pub use riddles::{Riddle, RiddleBook};
pub use session::{SessionParts, TrackingSession};
pub use state::{AnswerOutcome, KeyState, TrackedKey, TrackingState};
pub use timer::IntervalHandle;
