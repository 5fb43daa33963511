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

//! Tracking loop configuration.
//!
//! Every field has a default matching the constants the overlay was tuned
//! with, so a config file only needs the values it overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::geometry::MarkerId;

/// What to do when a marker id shows up that no key was configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CreationPolicy {
    /// Keys exist only for configured marker ids; unknown ids are ignored.
    #[default]
    Strict,
    /// Unknown ids get a key on first observation.
    Lazy,
}

/// Where a bound key's orientation comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrientationMode {
    /// Use the estimated marker rotation.
    #[default]
    Pose,
    /// Ignore rotation and keep the key upright.
    Upright,
}

/// One expected key: the marker it is bound to and the riddle guarding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    pub marker_id: MarkerId,
    pub riddle_id: u32,
}

impl KeySpec {
    /// Pair marker ids with riddle ids by position. Missing riddle ids fall
    /// back to the 1-based position of the marker.
    pub fn pair(marker_ids: &[MarkerId], riddle_ids: &[u32]) -> Vec<KeySpec> {
        marker_ids
            .iter()
            .enumerate()
            .map(|(i, &marker_id)| KeySpec {
                marker_id,
                riddle_id: riddle_ids.get(i).copied().unwrap_or(i as u32 + 1),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Detection poll period in milliseconds.
    pub poll_interval_ms: u64,
    /// Render push period in milliseconds.
    pub render_interval_ms: u64,
    /// A key not observed for this long is hidden.
    pub stale_threshold_ms: u64,
    /// Physical edge length of the printed markers.
    pub marker_size_mm: f64,
    /// Factor from estimator millimetres to scene units.
    pub translation_scale: f64,
    /// Allowed scene depth range `[far, near]` (both negative).
    pub depth_range: [f64; 2],
    /// Pose distance range used to normalise the distance scale.
    pub distance_range_mm: [f64; 2],
    /// Relative marker area range used when no pose is available.
    pub area_range: [f64; 2],
    pub area_exponent: f64,
    /// Final clamp applied to the distance scale.
    pub scale_range: [f64; 2],
    /// Share of the marker's smaller side the key may fill.
    pub marker_fill_ratio: f64,
    /// Pixel length that maps to a fit scale of 1.0.
    pub marker_fill_unit_px: f64,
    /// Floor for the fit scale.
    pub min_fit_scale: f64,
    /// Camera-to-key distance under which a key is targeted.
    pub targeting_distance: f64,
    /// Vertical field of view of the overlay camera, in degrees.
    pub vertical_fov_deg: f64,
    /// Depth used when positioning from the 2D marker centre.
    pub fallback_depth: f64,
    pub creation_policy: CreationPolicy,
    pub orientation: OrientationMode,
    pub keys: Vec<KeySpec>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            render_interval_ms: 16,
            stale_threshold_ms: 500,
            marker_size_mm: 50.0,
            translation_scale: 0.01,
            depth_range: [-2.0, -0.5],
            distance_range_mm: [50.0, 500.0],
            area_range: [0.001, 0.1],
            area_exponent: 0.3,
            scale_range: [0.2, 3.0],
            marker_fill_ratio: 0.3,
            marker_fill_unit_px: 50.0,
            min_fit_scale: 0.1,
            targeting_distance: 2.0,
            vertical_fov_deg: 75.0,
            fallback_depth: -1.0,
            creation_policy: CreationPolicy::Strict,
            orientation: OrientationMode::Pose,
            keys: KeySpec::pair(&[42, 63, 91], &[1, 2, 3]),
        }
    }
}

impl TrackerConfig {
    /// Load a config from a JSON file. Absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| TrackerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: TrackerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.poll_interval_ms == 0 || self.render_interval_ms == 0 {
            return Err(TrackerError::InvalidConfig(
                "poll and render intervals must be non-zero".to_string(),
            ));
        }
        if self.marker_size_mm <= 0.0 {
            return Err(TrackerError::InvalidConfig(
                "marker_size_mm must be positive".to_string(),
            ));
        }
        for (name, [lo, hi]) in [
            ("depth_range", self.depth_range),
            ("distance_range_mm", self.distance_range_mm),
            ("area_range", self.area_range),
            ("scale_range", self.scale_range),
        ] {
            if !(lo < hi) {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} must be an increasing pair, got [{lo}, {hi}]"
                )));
            }
        }
        if self.stale_threshold_ms == 0 {
            return Err(TrackerError::InvalidConfig(
                "stale_threshold_ms must be non-zero".to_string(),
            ));
        }
        for (name, value) in [
            ("area_range lower bound", self.area_range[0]),
            ("distance_range_mm lower bound", self.distance_range_mm[0]),
            ("scale_range lower bound", self.scale_range[0]),
            ("translation_scale", self.translation_scale),
            ("targeting_distance", self.targeting_distance),
            ("marker_fill_ratio", self.marker_fill_ratio),
            ("marker_fill_unit_px", self.marker_fill_unit_px),
            ("min_fit_scale", self.min_fit_scale),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(self.vertical_fov_deg > 0.0 && self.vertical_fov_deg < 180.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "vertical_fov_deg must be within (0, 180), got {}",
                self.vertical_fov_deg
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }
}
