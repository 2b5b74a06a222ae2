use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Row written for a gaze sample that has no projection in a reference image.
pub const SENTINEL: [i32; 2] = [-1, -1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    Valid,
    Invalid,
}

/// One eye-tracker reading. `position` is normalized to the scene frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub timestamp_s: f64,
    pub position: (f64, f64),
    pub validity: Validity,
}

impl GazeSample {
    pub fn new(timestamp_s: f64, position: (f64, f64), validity: Validity) -> GazeSample {
        GazeSample {
            timestamp_s,
            position,
            validity,
        }
    }

    pub fn valid(timestamp_s: f64, x: f64, y: f64) -> GazeSample {
        Self::new(timestamp_s, (x, y), Validity::Valid)
    }

    pub fn invalid(timestamp_s: f64) -> GazeSample {
        Self::new(timestamp_s, (0.0, 0.0), Validity::Invalid)
    }

    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }

    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp_s * 1000.0
    }

    /// Pixel position of the gaze in a frame of `frame_w_h`.
    pub fn denormalize(&self, frame_w_h: (u32, u32)) -> (f64, f64) {
        (
            self.position.0 * frame_w_h.0 as f64,
            self.position.1 * frame_w_h.1 as f64,
        )
    }
}

/// A decoded scene frame. The source owns it for one step of the run.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub timestamp_ms: f64,
    pub pixels: RgbImage,
}

impl Frame {
    pub fn new(index: usize, timestamp_ms: f64, pixels: RgbImage) -> Frame {
        Frame {
            index,
            timestamp_ms,
            pixels,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Gaze position inside a reference image for one output slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectedGazePoint {
    pub frame_index: usize,
    pub coord: Option<(i32, i32)>,
}

impl ProjectedGazePoint {
    pub fn undefined(frame_index: usize) -> ProjectedGazePoint {
        ProjectedGazePoint {
            frame_index,
            coord: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.coord.is_some()
    }

    pub fn row(&self) -> [i32; 2] {
        match self.coord {
            Some((x, y)) => [x, y],
            None => SENTINEL,
        }
    }
}
