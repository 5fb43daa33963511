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

//! Coplanar POSIT for square markers.
//!
//! Pose from orthography and scaling with iterations, specialised for four
//! coplanar model points. A planar target seen under perspective has two
//! valid poses; both are refined and returned, ordered by reprojection
//! error.

use nalgebra::{Matrix2, Matrix3, Matrix3x4, Matrix4x2, Point2, Vector3, Vector4};

use crate::error::TrackerError;
use crate::pose::{PoseEstimate, PoseEstimator, PoseSolution};

const MAX_ITERATIONS: usize = 100;
const CONVERGENCE: f64 = 1e-6;
const DEGENERATE: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    rotation: Matrix3<f64>,
    /// Camera-space position of the first model corner.
    origin: Vector3<f64>,
}

#[derive(Debug, Clone)]
pub struct CoplanarPosit {
    marker_size: f64,
    focal_length: f64,
    /// Corners in marker space: TL, TR, BR, BL with Y up.
    model: [Vector3<f64>; 4],
    /// `model[i] - model[0]`.
    model_vectors: [Vector3<f64>; 4],
    pseudo_inverse: Matrix3x4<f64>,
}

impl CoplanarPosit {
    pub fn new(marker_size: f64, focal_length: f64) -> Self {
        let h = marker_size / 2.0;
        let model = [
            Vector3::new(-h, h, 0.0),
            Vector3::new(h, h, 0.0),
            Vector3::new(h, -h, 0.0),
            Vector3::new(-h, -h, 0.0),
        ];
        let model_vectors = model.map(|p| p - model[0]);
        let pseudo_inverse = planar_pseudo_inverse(&model_vectors);
        Self {
            marker_size,
            focal_length,
            model,
            model_vectors,
            pseudo_inverse,
        }
    }

    pub fn marker_size(&self) -> f64 {
        self.marker_size
    }

    /// One POS step: the two scaled-orthographic poses consistent with
    /// `image`.
    fn pos(&self, image: &[Point2<f64>; 4]) -> Option<[Candidate; 2]> {
        let xs = Vector4::from_fn(|i, _| image[i].x - image[0].x);
        let ys = Vector4::from_fn(|i, _| image[i].y - image[0].y);
        let i0 = self.pseudo_inverse * xs;
        let j0 = self.pseudo_inverse * ys;

        let ii = i0.dot(&i0);
        let jj = j0.dot(&j0);
        let ij = i0.dot(&j0);
        let diff = jj - ii;
        let root = (diff * diff + 4.0 * ij * ij).sqrt();
        let (lambda, mu) = if diff >= 0.0 {
            let lambda = ((diff + root) / 2.0).sqrt();
            let mu = if lambda > DEGENERATE { -ij / lambda } else { 0.0 };
            (lambda, mu)
        } else {
            let mu = ((root - diff) / 2.0).sqrt();
            let lambda = if mu > DEGENERATE { -ij / mu } else { 0.0 };
            (lambda, mu)
        };

        let build = |sign: f64| -> Option<Candidate> {
            let i = i0 + Vector3::z() * (sign * lambda);
            let j = j0 + Vector3::z() * (sign * mu);
            let (ni, nj) = (i.norm(), j.norm());
            if ni < DEGENERATE || nj < DEGENERATE {
                return None;
            }
            let scale = (ni + nj) / 2.0;
            let r0 = i / ni;
            let r1 = j / nj;
            let r2 = r0.cross(&r1);
            let n2 = r2.norm();
            if n2 < DEGENERATE {
                return None;
            }
            let r2 = r2 / n2;
            Some(Candidate {
                rotation: Matrix3::from_rows(&[r0.transpose(), r1.transpose(), r2.transpose()]),
                origin: Vector3::new(
                    image[0].x / scale,
                    image[0].y / scale,
                    self.focal_length / scale,
                ),
            })
        };
        Some([build(1.0)?, build(-1.0)?])
    }

    /// Mean pixel distance between `image` and the reprojected model.
    /// Infinite if any corner ends up behind the camera.
    fn reprojection_error(&self, candidate: &Candidate, image: &[Point2<f64>; 4]) -> f64 {
        let mut total = 0.0;
        for (v, p) in self.model_vectors.iter().zip(image.iter()) {
            let cam = candidate.rotation * v + candidate.origin;
            if cam.z <= 0.0 {
                return f64::INFINITY;
            }
            let projected = Point2::new(
                self.focal_length * cam.x / cam.z,
                self.focal_length * cam.y / cam.z,
            );
            total += (projected - *p).norm();
        }
        total / 4.0
    }

    fn refine(&self, start: Candidate, image: &[Point2<f64>; 4]) -> (Candidate, f64) {
        let mut best = start;
        let mut previous: Option<[Point2<f64>; 4]> = None;
        for _ in 0..MAX_ITERATIONS {
            let r2 = best.rotation.row(2).transpose();
            let depth = best.origin.z;
            let corrected: [Point2<f64>; 4] = std::array::from_fn(|i| {
                let eps = r2.dot(&self.model_vectors[i]) / depth;
                Point2::new(image[i].x * (1.0 + eps), image[i].y * (1.0 + eps))
            });
            let Some([a, b]) = self.pos(&corrected) else {
                break;
            };
            best = if self.reprojection_error(&b, image) < self.reprojection_error(&a, image) {
                b
            } else {
                a
            };
            if let Some(prev) = previous {
                let delta = prev
                    .iter()
                    .zip(corrected.iter())
                    .map(|(p, c)| (p.x - c.x).abs() + (p.y - c.y).abs())
                    .fold(0.0, f64::max);
                if delta < CONVERGENCE {
                    break;
                }
            }
            previous = Some(corrected);
        }
        let error = self.reprojection_error(&best, image);
        (best, error)
    }

    fn solution(&self, candidate: Candidate, error: f64) -> PoseSolution {
        PoseSolution {
            rotation: candidate.rotation,
            translation: candidate.origin - candidate.rotation * self.model[0],
            error,
        }
    }
}

impl PoseEstimator for CoplanarPosit {
    fn estimate(&self, corners: &[Point2<f64>; 4]) -> Result<PoseEstimate, TrackerError> {
        if self.focal_length <= 0.0 || !self.focal_length.is_finite() {
            return Err(TrackerError::Pose(format!(
                "invalid focal length {}",
                self.focal_length
            )));
        }
        if corners.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(TrackerError::Pose("non-finite corner".to_string()));
        }
        let [first, second] = self
            .pos(corners)
            .ok_or_else(|| TrackerError::Pose("degenerate quadrilateral".to_string()))?;
        let (a, error_a) = self.refine(first, corners);
        let (b, error_b) = self.refine(second, corners);
        if !error_a.is_finite() && !error_b.is_finite() {
            return Err(TrackerError::Pose(
                "no solution in front of the camera".to_string(),
            ));
        }
        Ok(PoseEstimate::from_candidates(
            self.solution(a, error_a),
            self.solution(b, error_b),
        ))
    }

    fn focal_length(&self) -> f64 {
        self.focal_length
    }

    fn set_focal_length(&mut self, focal_length: f64) {
        self.focal_length = focal_length;
    }
}

/// Least-squares inverse of the in-plane model vectors. The third row is
/// zero since the model has no extent along its normal.
fn planar_pseudo_inverse(vectors: &[Vector3<f64>; 4]) -> Matrix3x4<f64> {
    let a = Matrix4x2::from_fn(|r, c| vectors[r][c]);
    let normal = a.transpose() * a;
    let inverse = normal.try_inverse().unwrap_or_else(Matrix2::zeros);
    let p = inverse * a.transpose();
    Matrix3x4::from_fn(|r, c| if r < 2 { p[(r, c)] } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;

    const FOCAL: f64 = 640.0;

    fn project(posit: &CoplanarPosit, rotation: &Matrix3<f64>, t: Vector3<f64>) -> [Point2<f64>; 4] {
        posit.model.map(|p| {
            let v = rotation * p + t;
            Point2::new(FOCAL * v.x / v.z, FOCAL * v.y / v.z)
        })
    }

    fn assert_recovers(rotation: Matrix3<f64>, t: Vector3<f64>) -> PoseEstimate {
        let posit = CoplanarPosit::new(50.0, FOCAL);
        let estimate = posit.estimate(&project(&posit, &rotation, t)).unwrap();
        assert!(estimate.error() < 1e-4, "error {}", estimate.error());
        assert!(
            (estimate.translation() - t).amax() < 1e-4,
            "translation {:?}",
            estimate.translation()
        );
        assert!((estimate.rotation() - rotation).amax() < 1e-6);
        estimate
    }

    #[test]
    fn frontal_marker() {
        let estimate = assert_recovers(Matrix3::identity(), Vector3::new(0.0, 0.0, 100.0));
        assert!(estimate.alternative.error < 1e-9);
    }

    #[test]
    fn marker_turned_about_vertical_axis() {
        let rotation = *Rotation3::from_axis_angle(&Vector3::y_axis(), 25f64.to_radians()).matrix();
        let estimate = assert_recovers(rotation, Vector3::new(20.0, -10.0, 300.0));
        assert!(estimate.alternative.error > 1.0);
    }

    #[test]
    fn marker_tilted_on_two_axes() {
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.4)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), -0.3);
        let estimate = assert_recovers(*rotation.matrix(), Vector3::new(-40.0, 30.0, 250.0));
        assert!(estimate.alternative.error > 1.0);
    }

    #[test]
    fn collapsed_quad_is_rejected() {
        let posit = CoplanarPosit::new(50.0, FOCAL);
        let point = Point2::new(3.0, 4.0);
        assert!(matches!(
            posit.estimate(&[point; 4]),
            Err(TrackerError::Pose(_))
        ));
    }

    #[test]
    fn focal_length_can_be_reconfigured() {
        let mut posit = CoplanarPosit::new(50.0, FOCAL);
        posit.set_focal_length(1280.0);
        assert_eq!(posit.focal_length(), 1280.0);
        posit.set_focal_length(0.0);
        let corners = project(&CoplanarPosit::new(50.0, FOCAL), &Matrix3::identity(), Vector3::new(0.0, 0.0, 100.0));
        assert!(posit.estimate(&corners).is_err());
    }
}
