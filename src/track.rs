use std::path::Path;

use image::{ImageReader, RgbImage};

use crate::error::{GazeError, Result};
use crate::features::{Feature, FeatureExtractor, FeatureMatcher, Homography, HomographyEstimator};

/// A static image searched for in every scene frame.
///
/// Descriptors are computed once at construction. `trace` accumulates the
/// gaze history drawn over the run.
pub struct ReferenceTrack {
    pub name: String,
    pub image: RgbImage,
    pub size: (u32, u32),
    pub features: Vec<Feature>,
    pub trace: RgbImage,
}

/// Track name from an image path: the file name up to its first `.`.
pub fn track_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or("reference")
        .to_string()
}

impl ReferenceTrack {
    pub fn from_image(name: &str, image: RgbImage, extractor: &dyn FeatureExtractor) -> ReferenceTrack {
        let gray = image::imageops::grayscale(&image);
        let features = extractor.detect_and_compute(&gray);
        log::info!("reference `{}`: {} features", name, features.len());
        ReferenceTrack {
            name: name.to_string(),
            size: image.dimensions(),
            trace: image.clone(),
            image,
            features,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P, extractor: &dyn FeatureExtractor) -> Result<ReferenceTrack> {
        let path = path.as_ref();
        let image = ImageReader::open(path)
            .map_err(|e| GazeError::io(path, e))?
            .decode()?
            .to_rgb8();
        Ok(Self::from_image(&track_name(path), image, extractor))
    }

    /// Frame -> reference transform for a frame with the given features.
    pub fn locate(
        &self,
        frame_features: &[Feature],
        matcher: &FeatureMatcher,
        estimator: &HomographyEstimator,
    ) -> Option<Homography> {
        let correspondences = matcher.match_features(&self.features, frame_features);
        if correspondences.len() < estimator.min_correspondences() {
            log::trace!(
                "`{}` not found: {} correspondences",
                self.name,
                correspondences.len()
            );
            return None;
        }
        estimator.estimate(&correspondences)
    }
}
