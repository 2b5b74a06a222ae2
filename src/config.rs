use serde::{Deserialize, Serialize};

use crate::error::{GazeError, Result};

/// How gaze samples are distributed over video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// One output per gaze sample that falls due before the frame.
    CatchUp,
    /// Exactly `k` outputs per source frame.
    FixedExpansion { k: usize },
}

/// The instant of a frame that gaze samples are compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueTime {
    FrameStart,
    /// Decode timestamp plus one nominal frame interval.
    FrameEnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub policy: AlignmentPolicy,
    pub due_time: DueTime,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            policy: AlignmentPolicy::FixedExpansion { k: 2 },
            due_time: DueTime::FrameStart,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub fast_threshold: u8,
    pub max_features: usize,
    pub blur_sigma: f32,
    pub nms_radius: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            max_features: 2000,
            blur_sigma: 2.0,
            nms_radius: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub ratio: f32,
    pub min_correspondences: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            ratio: 0.7,
            min_correspondences: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    pub reprojection_threshold: f64,
    pub max_iterations: usize,
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            reprojection_threshold: 5.0,
            max_iterations: 2000,
            confidence: 0.995,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub radius: i32,
    pub color: [u8; 3],
    pub trace_radius: i32,
    pub trace_color: [u8; 3],
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            radius: 8,
            color: [0, 0, 255],
            trace_radius: 5,
            trace_color: [0, 255, 0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sync: SyncConfig,
    pub extractor: ExtractorConfig,
    pub matcher: MatcherConfig,
    pub ransac: RansacConfig,
    pub marker: MarkerConfig,
    /// Resolution gaze positions are denormalized against. Defaults to the
    /// frame source's resolution.
    pub gaze_frame_size: Option<(u32, u32)>,
    pub vts_ticks_per_second: f64,
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            extractor: ExtractorConfig::default(),
            matcher: MatcherConfig::default(),
            ransac: RansacConfig::default(),
            marker: MarkerConfig::default(),
            gaze_frame_size: None,
            vts_ticks_per_second: 1_000_000.0,
            show_progress: true,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if let AlignmentPolicy::FixedExpansion { k: 0 } = self.sync.policy {
            return Err(GazeError::Config("fixed expansion needs k >= 1".to_string()));
        }
        if !(self.extractor.blur_sigma > 0.0) {
            return Err(GazeError::Config("blur_sigma must be positive".to_string()));
        }
        if !(self.matcher.ratio > 0.0 && self.matcher.ratio <= 1.0) {
            return Err(GazeError::Config(format!(
                "ratio test threshold {} is outside (0, 1]",
                self.matcher.ratio
            )));
        }
        if self.matcher.min_correspondences < 4 {
            return Err(GazeError::Config(
                "a homography needs at least 4 correspondences".to_string(),
            ));
        }
        if self.ransac.reprojection_threshold <= 0.0 {
            return Err(GazeError::Config(
                "reprojection threshold must be positive".to_string(),
            ));
        }
        if !(self.ransac.confidence > 0.0 && self.ransac.confidence < 1.0) {
            return Err(GazeError::Config(
                "ransac confidence must be inside (0, 1)".to_string(),
            ));
        }
        if self.vts_ticks_per_second <= 0.0 {
            return Err(GazeError::Config(
                "vts_ticks_per_second must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
