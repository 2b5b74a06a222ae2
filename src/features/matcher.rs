use glam::Vec2;
use rayon::prelude::*;

use super::extractor::{Feature, hamming_distance};
use crate::config::MatcherConfig;

/// A reference keypoint paired with the frame keypoint it was matched to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub reference: Vec2,
    pub frame: Vec2,
}

pub struct FeatureMatcher {
    ratio: f32,
}

impl FeatureMatcher {
    pub fn new(config: &MatcherConfig) -> FeatureMatcher {
        FeatureMatcher {
            ratio: config.ratio,
        }
    }

    /// Two-nearest-neighbour matching of every reference feature against
    /// the frame features, filtered by the ratio test.
    ///
    /// Fewer than two features on either side yields no correspondences.
    pub fn match_features(&self, reference: &[Feature], frame: &[Feature]) -> Vec<Correspondence> {
        if reference.len() < 2 || frame.len() < 2 {
            return Vec::new();
        }
        reference
            .par_iter()
            .filter_map(|query| {
                let (best_idx, best, second) = two_nearest(query, frame);
                if (best as f32) < self.ratio * second as f32 {
                    Some(Correspondence {
                        reference: query.p2d,
                        frame: frame[best_idx].p2d,
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

fn two_nearest(query: &Feature, candidates: &[Feature]) -> (usize, u32, u32) {
    let mut best = (0, u32::MAX);
    let mut second = u32::MAX;
    for (i, candidate) in candidates.iter().enumerate() {
        let d = hamming_distance(&query.descriptor, &candidate.descriptor);
        if d < best.1 {
            second = best.1;
            best = (i, d);
        } else if d < second {
            second = d;
        }
    }
    (best.0, best.1, second)
}
