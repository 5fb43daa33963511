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

//! Pose to scene transform binding.
//!
//! Scene convention: right handed, Y up, camera at the origin looking down
//! -Z. The pose solver reports depth along +Z, so depth is negated before
//! it is clamped into the configured range.

use nalgebra::{Point2, Point3, UnitQuaternion, Vector3};

use crate::config::{OrientationMode, TrackerConfig};
use crate::detection::Detection;
use crate::geometry::MarkerBounds;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneTransform {
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
    /// Distance scale multiplier, within the configured scale range.
    pub scale: f64,
    /// Fits the key inside the marker's apparent bounds. Independent of the
    /// distance scale.
    pub fit_scale: f64,
}

impl SceneTransform {
    /// Distance from the camera.
    pub fn distance(&self) -> f64 {
        self.position.coords.norm()
    }

    /// Fit scale times distance scale. The backend applies it on top of the
    /// model's own base scale.
    pub fn total_scale(&self) -> f64 {
        self.fit_scale * self.scale
    }

    /// Uniform-scale transform as a column-major 4x4 matrix.
    pub fn matrix(&self) -> [f64; 16] {
        let rotation = self.orientation.to_rotation_matrix().into_inner() * self.total_scale();
        crate::pose::pose_matrix(&rotation, &self.position.coords)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformBinder {
    translation_scale: f64,
    depth_range: [f64; 2],
    distance_range_mm: [f64; 2],
    area_range: [f64; 2],
    area_exponent: f64,
    scale_range: [f64; 2],
    marker_fill_ratio: f64,
    marker_fill_unit_px: f64,
    min_fit_scale: f64,
    vertical_fov_deg: f64,
    fallback_depth: f64,
    orientation: OrientationMode,
}

impl TransformBinder {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            translation_scale: config.translation_scale,
            depth_range: config.depth_range,
            distance_range_mm: config.distance_range_mm,
            area_range: config.area_range,
            area_exponent: config.area_exponent,
            scale_range: config.scale_range,
            marker_fill_ratio: config.marker_fill_ratio,
            marker_fill_unit_px: config.marker_fill_unit_px,
            min_fit_scale: config.min_fit_scale,
            vertical_fov_deg: config.vertical_fov_deg,
            fallback_depth: config.fallback_depth,
            orientation: config.orientation,
        }
    }

    pub fn bind(&self, detection: &Detection, frame_width: u32, frame_height: u32) -> SceneTransform {
        let fit_scale = self.fit_scale(&detection.bounds);
        match &detection.pose {
            Some(pose) => {
                let translation = pose.translation();
                SceneTransform {
                    position: self.position_from_translation(translation),
                    orientation: match self.orientation {
                        OrientationMode::Pose => pose.best.orientation(),
                        OrientationMode::Upright => UnitQuaternion::identity(),
                    },
                    scale: self.distance_scale(translation.z),
                    fit_scale,
                }
            }
            None => SceneTransform {
                position: self.fallback_position(detection.center(), frame_width, frame_height),
                orientation: UnitQuaternion::identity(),
                scale: self.area_scale(&detection.bounds, frame_width, frame_height),
                fit_scale,
            },
        }
    }

    /// Millimetres to scene units, with depth flipped and clamped.
    pub fn position_from_translation(&self, translation: &Vector3<f64>) -> Point3<f64> {
        let scaled = translation * self.translation_scale;
        Point3::new(scaled.x, scaled.y, self.clamp_depth(-scaled.z))
    }

    /// Scale from the pose depth, inversely proportional to the clamped
    /// distance. Zero, negative and non-finite depths are handled.
    pub fn distance_scale(&self, depth_mm: f64) -> f64 {
        let [near, far] = self.distance_range_mm;
        let distance = if depth_mm.is_finite() {
            depth_mm.abs().clamp(near, far)
        } else {
            far
        };
        self.clamp_scale(far / distance)
    }

    /// Scale from the marker's share of the frame, used without a pose.
    pub fn area_scale(&self, bounds: &MarkerBounds, frame_width: u32, frame_height: u32) -> f64 {
        let [lo, hi] = self.area_range;
        let frame_area = frame_width as f64 * frame_height as f64;
        let relative = if frame_area > 0.0 {
            bounds.area() / frame_area
        } else {
            0.0
        };
        let relative = if relative.is_finite() {
            relative.clamp(lo, hi)
        } else {
            lo
        };
        self.clamp_scale((relative / lo).powf(self.area_exponent))
    }

    /// Scale that keeps the key within a fraction of the marker's smaller
    /// side, floored so tiny or degenerate markers stay visible.
    pub fn fit_scale(&self, bounds: &MarkerBounds) -> f64 {
        let side = bounds.width().min(bounds.height());
        let scale = side * self.marker_fill_ratio / self.marker_fill_unit_px;
        if scale.is_finite() {
            scale.max(self.min_fit_scale)
        } else {
            self.min_fit_scale
        }
    }

    /// Project a pixel through the overlay camera to the fallback depth.
    pub fn fallback_position(&self, center: Point2<f64>, frame_width: u32, frame_height: u32) -> Point3<f64> {
        if frame_width == 0 || frame_height == 0 {
            return Point3::new(0.0, 0.0, self.clamp_depth(self.fallback_depth));
        }
        let depth = self.clamp_depth(self.fallback_depth);
        let ndc_x = center.x / frame_width as f64 * 2.0 - 1.0;
        let ndc_y = 1.0 - center.y / frame_height as f64 * 2.0;
        let half_height = depth.abs() * (self.vertical_fov_deg.to_radians() / 2.0).tan();
        let half_width = half_height * frame_width as f64 / frame_height as f64;
        Point3::new(ndc_x * half_width, ndc_y * half_height, depth)
    }

    fn clamp_depth(&self, z: f64) -> f64 {
        let [far, near] = self.depth_range;
        if z.is_finite() {
            z.clamp(far, near)
        } else {
            far
        }
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        let [lo, hi] = self.scale_range;
        scale.clamp(lo, hi)
    }
}
