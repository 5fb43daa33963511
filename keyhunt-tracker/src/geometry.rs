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

//! Image-space marker geometry.
//!
//! Detector output lives in pixel coordinates (origin top-left, Y down). The
//! pose solver expects a centre-origin frame with Y up; [`recenter`] and
//! [`uncenter`] convert between the two.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

pub type MarkerId = u32;

/// One detected marker in one frame. Corners are in detector order
/// (top-left, top-right, bottom-right, bottom-left of the printed pattern).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
    pub id: MarkerId,
    pub corners: [Point2<f64>; 4],
}

impl MarkerObservation {
    pub fn new(id: MarkerId, corners: [[f64; 2]; 4]) -> Self {
        Self {
            id,
            corners: corners.map(|[x, y]| Point2::new(x, y)),
        }
    }

    /// Mean of the four corners.
    pub fn center(&self) -> Point2<f64> {
        let sum = self
            .corners
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, c| acc + c.coords);
        Point2::from(sum / 4.0)
    }

    pub fn bounds(&self) -> MarkerBounds {
        MarkerBounds::from_points(&self.corners)
    }

    /// Corners in the solver frame for a `width` x `height` image.
    pub fn recentered_corners(&self, width: u32, height: u32) -> [Point2<f64>; 4] {
        self.corners.map(|c| recenter(c, width, height))
    }
}

/// Axis-aligned bounding box of a marker in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkerBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl MarkerBounds {
    /// Zero box for an empty slice.
    pub fn from_points(points: &[Point2<f64>]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        points.iter().skip(1).fold(
            Self {
                min_x: first.x,
                max_x: first.x,
                min_y: first.y,
                max_y: first.y,
            },
            |b, p| Self {
                min_x: b.min_x.min(p.x),
                max_x: b.max_x.max(p.x),
                min_y: b.min_y.min(p.y),
                max_y: b.max_y.max(p.y),
            },
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// Pixel coordinates to the centre-origin, Y-up solver frame.
pub fn recenter(p: Point2<f64>, width: u32, height: u32) -> Point2<f64> {
    Point2::new(p.x - width as f64 / 2.0, height as f64 / 2.0 - p.y)
}

/// Inverse of [`recenter`].
pub fn uncenter(p: Point2<f64>, width: u32, height: u32) -> Point2<f64> {
    Point2::new(p.x + width as f64 / 2.0, height as f64 / 2.0 - p.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(cx: f64, cy: f64, half: f64) -> MarkerObservation {
        MarkerObservation::new(
            42,
            [
                [cx - half, cy - half],
                [cx + half, cy - half],
                [cx + half, cy + half],
                [cx - half, cy + half],
            ],
        )
    }

    #[test]
    fn marker_at_frame_center_recenters_to_origin() {
        let marker = square(320.0, 240.0, 40.0);
        let corners = marker.recentered_corners(640, 480);
        let mean = corners
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, c| acc + c.coords)
            / 4.0;
        assert_eq!(mean, nalgebra::Vector2::new(0.0, 0.0));
        // top-left in pixels is up-left in the solver frame
        assert_eq!(corners[0], Point2::new(-40.0, 40.0));
    }

    #[test]
    fn recenter_then_uncenter_is_identity() {
        // Values exactly representable so the round trip is bit-exact.
        for &(x, y, w, h) in &[
            (0.0, 0.0, 640, 480),
            (639.5, 479.25, 640, 480),
            (-12.0, 1e4, 1, 3),
            (1920.0, 1080.0, 1920, 1080),
        ] {
            let p = Point2::new(x, y);
            assert_eq!(uncenter(recenter(p, w, h), w, h), p);
        }
    }

    #[test]
    fn bounds_cover_all_corners() {
        let marker = MarkerObservation::new(1, [[10.0, 5.0], [30.0, 8.0], [28.0, 40.0], [9.0, 35.0]]);
        let b = marker.bounds();
        assert_eq!((b.min_x, b.max_x, b.min_y, b.max_y), (9.0, 30.0, 5.0, 40.0));
        assert_eq!(b.area(), 21.0 * 35.0);
    }

    #[test]
    fn empty_bounds_are_zero() {
        assert_eq!(MarkerBounds::from_points(&[]), MarkerBounds::default());
    }

    #[test]
    fn center_is_corner_mean() {
        assert_eq!(square(100.0, 50.0, 10.0).center(), Point2::new(100.0, 50.0));
    }
}
