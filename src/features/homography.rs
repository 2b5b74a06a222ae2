use glam::Vec2;
use log::{debug, trace};
use nalgebra as na;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::matcher::Correspondence;
use crate::config::RansacConfig;

const SAMPLE_SIZE: usize = 4;

/// Projective transform from frame pixels to reference pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(pub na::Matrix3<f64>);

impl Homography {
    pub fn identity() -> Homography {
        Homography(na::Matrix3::identity())
    }

    pub fn from_matrix(m: na::Matrix3<f64>) -> Option<Homography> {
        normalize_scale(m).map(Homography)
    }

    pub fn matrix(&self) -> &na::Matrix3<f64> {
        &self.0
    }

    /// Maps a point, or `None` when it lands on the line at infinity.
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let p = self.0 * na::Vector3::new(x, y, 1.0);
        if p.z.abs() < f64::EPSILON {
            return None;
        }
        let (u, v) = (p.x / p.z, p.y / p.z);
        if u.is_finite() && v.is_finite() {
            Some((u, v))
        } else {
            None
        }
    }

    fn transfer_error(&self, c: &Correspondence) -> f64 {
        match self.apply(c.frame.x as f64, c.frame.y as f64) {
            Some((u, v)) => {
                ((u - c.reference.x as f64).powi(2) + (v - c.reference.y as f64).powi(2)).sqrt()
            }
            None => f64::INFINITY,
        }
    }
}

fn normalize_scale(m: na::Matrix3<f64>) -> Option<na::Matrix3<f64>> {
    if !m.iter().all(|v| v.is_finite()) {
        return None;
    }
    let scaled = if m[(2, 2)].abs() > 1e-12 {
        m / m[(2, 2)]
    } else {
        let n = m.norm();
        if n < 1e-12 {
            return None;
        }
        m / n
    };
    if scaled.determinant().abs() < 1e-12 {
        return None;
    }
    Some(scaled)
}

/// Similarity transform moving the centroid to the origin with mean
/// distance sqrt(2).
fn normalizing_transform(points: &[na::Point2<f64>]) -> na::Matrix3<f64> {
    let n = points.len() as f64;
    let centroid = points.iter().fold(na::Vector2::zeros(), |acc, p| acc + p.coords) / n;
    let mean_dist = points.iter().map(|p| (p.coords - centroid).norm()).sum::<f64>() / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    na::Matrix3::new(s, 0.0, -s * centroid.x, 0.0, s, -s * centroid.y, 0.0, 0.0, 1.0)
}

/// Normalized direct linear transform, frame -> reference.
///
/// Solves through the normal matrix so the minimal four point case still
/// has a full eigen basis.
pub fn fit_homography_dlt(correspondences: &[Correspondence]) -> Option<Homography> {
    if correspondences.len() < SAMPLE_SIZE {
        return None;
    }
    let src: Vec<_> = correspondences
        .iter()
        .map(|c| na::Point2::new(c.frame.x as f64, c.frame.y as f64))
        .collect();
    let dst: Vec<_> = correspondences
        .iter()
        .map(|c| na::Point2::new(c.reference.x as f64, c.reference.y as f64))
        .collect();
    let t_src = normalizing_transform(&src);
    let t_dst = normalizing_transform(&dst);

    let mut ata = na::SMatrix::<f64, 9, 9>::zeros();
    for (p, q) in src.iter().zip(&dst) {
        let p = t_src.transform_point(p);
        let q = t_dst.transform_point(q);
        let (x, y, u, v) = (p.x, p.y, q.x, q.y);
        let rows = [
            na::SVector::<f64, 9>::from([-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u]),
            na::SVector::<f64, 9>::from([0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v]),
        ];
        for r in &rows {
            ata += r * r.transpose();
        }
    }
    let eigen = ata.symmetric_eigen();
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = eigen.eigenvectors.column(min_idx);
    let h_norm = na::Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);
    let t_dst_inv = t_dst.try_inverse()?;
    Homography::from_matrix(t_dst_inv * h_norm * t_src)
}

fn cross(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    (a - o).perp_dot(b - o)
}

/// True when any three of the four points are (nearly) collinear.
fn is_degenerate(points: &[Vec2; SAMPLE_SIZE]) -> bool {
    let scale = points
        .iter()
        .flat_map(|p| points.iter().map(move |q| (*p - *q).length_squared()))
        .fold(0.0f32, f32::max)
        .max(1.0);
    let eps = 1e-3 * scale;
    for i in 0..SAMPLE_SIZE {
        for j in (i + 1)..SAMPLE_SIZE {
            for k in (j + 1)..SAMPLE_SIZE {
                if cross(points[i], points[j], points[k]).abs() < eps {
                    return true;
                }
            }
        }
    }
    false
}

fn required_iterations(confidence: f64, inlier_ratio: f64, max_iterations: usize) -> usize {
    let w = inlier_ratio.powi(SAMPLE_SIZE as i32);
    if w <= f64::EPSILON {
        return max_iterations;
    }
    if w >= 1.0 - f64::EPSILON {
        return 1;
    }
    let n = (1.0 - confidence).ln() / (1.0 - w).ln();
    (n.ceil().max(1.0) as usize).min(max_iterations)
}

/// RANSAC fit of the frame -> reference homography.
pub struct HomographyEstimator {
    config: RansacConfig,
    min_correspondences: usize,
}

impl HomographyEstimator {
    pub fn new(config: &RansacConfig, min_correspondences: usize) -> HomographyEstimator {
        HomographyEstimator {
            config: config.clone(),
            min_correspondences: min_correspondences.max(SAMPLE_SIZE),
        }
    }

    pub fn min_correspondences(&self) -> usize {
        self.min_correspondences
    }

    fn inliers(&self, h: &Homography, correspondences: &[Correspondence]) -> Vec<usize> {
        correspondences
            .iter()
            .enumerate()
            .filter(|(_, c)| h.transfer_error(c) < self.config.reprojection_threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// `None` when there are too few correspondences or no consistent
    /// transform is found.
    pub fn estimate(&self, correspondences: &[Correspondence]) -> Option<Homography> {
        let n = correspondences.len();
        if n < self.min_correspondences {
            trace!("{} correspondences, need {}", n, self.min_correspondences);
            return None;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut best: Option<(Homography, Vec<usize>)> = None;
        let mut iterations = self.config.max_iterations;
        let mut i = 0;
        while i < iterations {
            i += 1;
            let idx = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE);
            let sample: Vec<Correspondence> = idx.iter().map(|j| correspondences[j]).collect();
            let src = [sample[0].frame, sample[1].frame, sample[2].frame, sample[3].frame];
            let dst = [
                sample[0].reference,
                sample[1].reference,
                sample[2].reference,
                sample[3].reference,
            ];
            if is_degenerate(&src) || is_degenerate(&dst) {
                continue;
            }
            let Some(h) = fit_homography_dlt(&sample) else {
                continue;
            };
            let inliers = self.inliers(&h, correspondences);
            if best.as_ref().is_none_or(|(_, b)| inliers.len() > b.len()) {
                iterations = required_iterations(
                    self.config.confidence,
                    inliers.len() as f64 / n as f64,
                    self.config.max_iterations,
                );
                best = Some((h, inliers));
            }
        }
        let (model, best_inliers) = best?;
        if best_inliers.len() < SAMPLE_SIZE {
            debug!("ransac found no consensus among {} correspondences", n);
            return None;
        }

        let inlier_set: Vec<_> = best_inliers.iter().map(|&j| correspondences[j]).collect();
        let refined = match fit_homography_dlt(&inlier_set) {
            Some(h) if self.inliers(&h, correspondences).len() >= best_inliers.len() => h,
            _ => model,
        };
        debug!(
            "homography after {} iterations: {}/{} inliers",
            i,
            best_inliers.len(),
            n
        );
        Some(refined)
    }
}
