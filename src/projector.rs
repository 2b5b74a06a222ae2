use crate::features::Homography;
use crate::types::{GazeSample, ProjectedGazePoint};

/// Maps frame-space gaze into a reference image's pixel space.
#[derive(Debug, Clone, Copy)]
pub struct GazeProjector {
    frame_w_h: (u32, u32),
}

impl GazeProjector {
    /// `frame_w_h` is the resolution normalized gaze is scaled against.
    pub fn new(frame_w_h: (u32, u32)) -> GazeProjector {
        GazeProjector { frame_w_h }
    }

    /// Sentinel for invalid samples, a missing transform, or a point
    /// outside `[0, w] x [0, h]` of the reference.
    pub fn project(
        &self,
        frame_index: usize,
        sample: &GazeSample,
        homography: Option<&Homography>,
        reference_w_h: (u32, u32),
    ) -> ProjectedGazePoint {
        let Some(h) = homography.filter(|_| sample.is_valid()) else {
            return ProjectedGazePoint::undefined(frame_index);
        };
        let (x, y) = sample.denormalize(self.frame_w_h);
        let coord = h
            .apply(x, y)
            .filter(|&(u, v)| in_bounds(u, v, reference_w_h))
            .map(|(u, v)| (u.round() as i32, v.round() as i32));
        ProjectedGazePoint { frame_index, coord }
    }
}

fn in_bounds(u: f64, v: f64, (w, h): (u32, u32)) -> bool {
    (0.0..=w as f64).contains(&u) && (0.0..=h as f64).contains(&v)
}
