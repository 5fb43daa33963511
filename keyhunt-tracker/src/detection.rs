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

//! Marker detection and pose estimation for one sampled frame.

use nalgebra::Point2;
use tracing::{debug, trace};

use crate::error::TrackerError;
use crate::frame::PixelBuffer;
use crate::geometry::{MarkerBounds, MarkerObservation};
use crate::pose::{PoseEstimate, PoseEstimator};
use crate::posit::CoplanarPosit;

/// Finds square markers in an RGBA frame. Corners are returned in pixel
/// coordinates.
pub trait MarkerDetector: Send {
    fn detect(&mut self, frame: &PixelBuffer) -> Result<Vec<MarkerObservation>, TrackerError>;
}

/// A marker observed in the current frame, with its pose when the solver
/// found one.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub observation: MarkerObservation,
    pub bounds: MarkerBounds,
    pub pose: Option<PoseEstimate>,
}

impl Detection {
    pub fn center(&self) -> Point2<f64> {
        self.observation.center()
    }
}

pub struct DetectionPipeline {
    detector: Box<dyn MarkerDetector>,
    estimator: Box<dyn PoseEstimator>,
    frame_width: u32,
}

impl DetectionPipeline {
    pub fn new(detector: Box<dyn MarkerDetector>, estimator: Box<dyn PoseEstimator>) -> Self {
        Self {
            detector,
            estimator,
            frame_width: 0,
        }
    }

    /// Pipeline using [`CoplanarPosit`] for markers of `marker_size_mm`.
    /// The focal length is set from the first frame.
    pub fn with_posit(detector: Box<dyn MarkerDetector>, marker_size_mm: f64) -> Self {
        Self::new(detector, Box::new(CoplanarPosit::new(marker_size_mm, 0.0)))
    }

    pub fn focal_length(&self) -> f64 {
        self.estimator.focal_length()
    }

    /// Detect markers in `frame` and estimate a pose for each.
    ///
    /// A detector failure or malformed frame fails the whole call. A marker
    /// whose pose cannot be solved is still returned, without a pose.
    pub fn process(&mut self, frame: &PixelBuffer) -> Result<Vec<Detection>, TrackerError> {
        frame.validate()?;
        if frame.width != self.frame_width {
            debug!(
                "frame width {} -> {}, reconfiguring pose solver",
                self.frame_width, frame.width
            );
            self.estimator.set_focal_length(frame.width as f64);
            self.frame_width = frame.width;
        }

        let observations = self.detector.detect(frame)?;
        trace!(
            frame = frame.frame_index,
            "{} markers detected",
            observations.len()
        );

        Ok(observations
            .into_iter()
            .map(|observation| {
                let corners = observation.recentered_corners(frame.width, frame.height);
                let pose = match self.estimator.estimate(&corners) {
                    Ok(pose) => Some(pose),
                    Err(e) => {
                        debug!(marker = observation.id, "no pose: {e}");
                        None
                    }
                };
                Detection {
                    bounds: observation.bounds(),
                    observation,
                    pose,
                }
            })
            .collect())
    }
}
