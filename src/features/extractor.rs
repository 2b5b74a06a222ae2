use std::collections::HashMap;

use glam::Vec2;
use image::GrayImage;
use imageproc::corners::{Corner, corners_fast9};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::ExtractorConfig;

pub const DESCRIPTOR_BYTES: usize = 32;
const DESCRIPTOR_BITS: usize = DESCRIPTOR_BYTES * 8;
/// Half size of the square patch BRIEF samples from.
const PATCH_RADIUS: i32 = 12;
const PATTERN_SEED: u64 = 0x6761_7a65;

pub type Descriptor = [u8; DESCRIPTOR_BYTES];

/// A keypoint with its binary descriptor.
#[derive(Debug, Clone)]
pub struct Feature {
    pub p2d: Vec2,
    pub score: f32,
    pub descriptor: Descriptor,
}

pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Keypoint detection plus description on an intensity image.
pub trait FeatureExtractor: Send + Sync {
    fn detect_and_compute(&self, image: &GrayImage) -> Vec<Feature>;
}

/// FAST-9 corners described with BRIEF-256.
pub struct BriefExtractor {
    config: ExtractorConfig,
    pattern: Vec<[i32; 4]>,
}

impl BriefExtractor {
    pub fn new(config: &ExtractorConfig) -> BriefExtractor {
        // the pattern has to be identical for reference and frame descriptors
        let mut rng = ChaCha8Rng::seed_from_u64(PATTERN_SEED);
        let pattern = (0..DESCRIPTOR_BITS)
            .map(|_| {
                [
                    rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS),
                ]
            })
            .collect();
        BriefExtractor {
            config: config.clone(),
            pattern,
        }
    }

    /// Corners far enough from the border for a full descriptor patch,
    /// strongest first, thinned by non-max suppression.
    fn keypoints(&self, image: &GrayImage) -> Vec<Corner> {
        let (w, h) = image.dimensions();
        let margin = (PATCH_RADIUS + 1) as u32 + (3.0 * self.config.blur_sigma).ceil() as u32;
        if w <= 2 * margin || h <= 2 * margin {
            return Vec::new();
        }
        let mut corners: Vec<Corner> = corners_fast9(image, self.config.fast_threshold)
            .into_iter()
            .filter(|c| c.x >= margin && c.y >= margin && c.x < w - margin && c.y < h - margin)
            .collect();
        corners.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.y.cmp(&b.y))
                .then(a.x.cmp(&b.x))
        });
        let mut kept = suppress_non_maximum(&corners, self.config.nms_radius);
        kept.truncate(self.config.max_features);
        kept
    }

    fn describe(&self, smoothed: &GrayImage, corner: &Corner) -> Descriptor {
        let mut descriptor = [0u8; DESCRIPTOR_BYTES];
        let (cx, cy) = (corner.x as i32, corner.y as i32);
        for (bit, [x1, y1, x2, y2]) in self.pattern.iter().enumerate() {
            let first = smoothed.get_pixel((cx + x1) as u32, (cy + y1) as u32).0[0];
            let second = smoothed.get_pixel((cx + x2) as u32, (cy + y2) as u32).0[0];
            if first < second {
                descriptor[bit / 8] |= 1 << (bit % 8);
            }
        }
        descriptor
    }
}

impl FeatureExtractor for BriefExtractor {
    fn detect_and_compute(&self, image: &GrayImage) -> Vec<Feature> {
        let keypoints = self.keypoints(image);
        if keypoints.is_empty() {
            return Vec::new();
        }
        let smoothed = imageproc::filter::gaussian_blur_f32(image, self.config.blur_sigma);
        keypoints
            .iter()
            .map(|c| Feature {
                p2d: Vec2::new(c.x as f32, c.y as f32),
                score: c.score,
                descriptor: self.describe(&smoothed, c),
            })
            .collect()
    }
}

/// Greedy radius suppression over corners sorted strongest first.
///
/// Ties are ordered by position, so the result does not depend on where the
/// pattern sits in the image.
fn suppress_non_maximum(sorted: &[Corner], radius: f32) -> Vec<Corner> {
    if radius <= 0.0 {
        return sorted.to_vec();
    }
    let cell = radius.ceil().max(1.0) as i64;
    let r2 = radius * radius;
    let mut grid: HashMap<(i64, i64), Vec<(f32, f32)>> = HashMap::new();
    let mut kept = Vec::new();
    for corner in sorted {
        let (x, y) = (corner.x as f32, corner.y as f32);
        let (gx, gy) = (corner.x as i64 / cell, corner.y as i64 / cell);
        let suppressed = (gx - 1..=gx + 1).any(|nx| {
            (gy - 1..=gy + 1).any(|ny| {
                grid.get(&(nx, ny)).is_some_and(|pts| {
                    pts.iter()
                        .any(|(px, py)| (px - x).powi(2) + (py - y).powi(2) <= r2)
                })
            })
        });
        if !suppressed {
            grid.entry((gx, gy)).or_default().push((x, y));
            kept.push(*corner);
        }
    }
    kept
}
