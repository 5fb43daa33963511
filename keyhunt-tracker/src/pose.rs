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

//! Pose estimates for planar markers.

use nalgebra::{Matrix3, Point2, UnitQuaternion, Vector3};

use crate::error::TrackerError;

/// One candidate pose: marker-to-camera rotation, marker centre in camera
/// coordinates (millimetres, +Z in front of the camera) and the mean
/// reprojection error in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSolution {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    pub error: f64,
}

impl PoseSolution {
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_matrix(&self.rotation)
    }

    /// 4x4 homogeneous transform, column-major.
    pub fn matrix(&self) -> [f64; 16] {
        pose_matrix(&self.rotation, &self.translation)
    }
}

/// Both solutions of the planar pose ambiguity. `best` always has the lower
/// (or equal) error, with NaN ranked as +inf.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseEstimate {
    pub best: PoseSolution,
    pub alternative: PoseSolution,
}

impl PoseEstimate {
    /// Order two solutions by error. A NaN error ranks as +inf.
    pub fn from_candidates(a: PoseSolution, b: PoseSolution) -> Self {
        let rank = |error: f64| if error.is_nan() { f64::INFINITY } else { error };
        if rank(b.error) < rank(a.error) {
            Self {
                best: b,
                alternative: a,
            }
        } else {
            Self {
                best: a,
                alternative: b,
            }
        }
    }

    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.best.rotation
    }

    pub fn translation(&self) -> &Vector3<f64> {
        &self.best.translation
    }

    pub fn error(&self) -> f64 {
        self.best.error
    }
}

/// Pose from four recentered corners (origin at the optical centre, Y up).
pub trait PoseEstimator: Send {
    fn estimate(&self, corners: &[Point2<f64>; 4]) -> Result<PoseEstimate, TrackerError>;

    fn focal_length(&self) -> f64;

    fn set_focal_length(&mut self, focal_length: f64);
}

/// Rotation in columns 0-2, translation in column 3, bottom row `0 0 0 1`.
pub fn pose_matrix(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> [f64; 16] {
    let mut out = [0.0; 16];
    for col in 0..3 {
        for row in 0..3 {
            out[col * 4 + row] = rotation[(row, col)];
        }
    }
    out[12] = translation.x;
    out[13] = translation.y;
    out[14] = translation.z;
    out[15] = 1.0;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution(error: f64) -> PoseSolution {
        PoseSolution {
            rotation: Matrix3::identity(),
            translation: Vector3::new(0.0, 0.0, 100.0),
            error,
        }
    }

    #[test]
    fn best_is_lower_error() {
        let estimate = PoseEstimate::from_candidates(solution(3.0), solution(0.5));
        assert_eq!(estimate.error(), 0.5);
        assert_eq!(estimate.alternative.error, 3.0);
    }

    #[test]
    fn nan_error_never_wins() {
        let estimate = PoseEstimate::from_candidates(solution(f64::NAN), solution(0.5));
        assert_eq!(estimate.error(), 0.5);
        assert!(estimate.alternative.error.is_nan());

        let estimate = PoseEstimate::from_candidates(solution(0.5), solution(f64::NAN));
        assert_eq!(estimate.error(), 0.5);

        let estimate = PoseEstimate::from_candidates(solution(f64::INFINITY), solution(f64::NAN));
        assert_eq!(estimate.error(), f64::INFINITY);
    }

    #[test]
    fn matrix_is_column_major() {
        let rotation = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let m = pose_matrix(&rotation, &Vector3::new(10.0, 11.0, 12.0));
        assert_eq!(
            m,
            [1.0, 4.0, 7.0, 0.0, 2.0, 5.0, 8.0, 0.0, 3.0, 6.0, 9.0, 0.0, 10.0, 11.0, 12.0, 1.0]
        );
    }

    #[test]
    fn identity_rotation_gives_identity_orientation() {
        assert!(solution(0.0).orientation().angle() < 1e-12);
    }
}
