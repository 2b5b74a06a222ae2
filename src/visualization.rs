use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};
use rerun::RecordingStream;

use crate::config::MarkerConfig;
use crate::error::Result;
use crate::track::ReferenceTrack;

/// Draws gaze markers. Callers pass copies; decoded frames are never drawn on.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    marker: MarkerConfig,
}

impl OverlayRenderer {
    pub fn new(marker: &MarkerConfig) -> OverlayRenderer {
        OverlayRenderer {
            marker: marker.clone(),
        }
    }

    /// Filled marker for the current gaze position.
    pub fn draw_marker(&self, canvas: &mut RgbImage, center: (i32, i32)) {
        draw_filled_circle_mut(canvas, center, self.marker.radius, Rgb(self.marker.color));
    }

    /// Smaller ring left behind on the persistent trace image.
    pub fn draw_trace(&self, canvas: &mut RgbImage, center: (i32, i32)) {
        let color = Rgb(self.marker.trace_color);
        draw_hollow_circle_mut(canvas, center, self.marker.trace_radius, color);
        if self.marker.trace_radius > 1 {
            draw_hollow_circle_mut(canvas, center, self.marker.trace_radius - 1, color);
        }
    }
}

pub fn track_color(track_idx: usize) -> (u8, u8, u8, u8) {
    let c = colorous::CATEGORY10[track_idx % colorous::CATEGORY10.len()];
    (c.r, c.g, c.b, 255)
}

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[(f32, f32)]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|(x, y)| (*x + 0.5, *y + 0.5)).collect()
}

pub fn log_image(recording: &RecordingStream, topic: &str, img: &RgbImage) -> Result<()> {
    let (w, h) = img.dimensions();
    recording.log(
        format!("{}/image", topic),
        &rerun::Image::from_rgb24(img.as_raw().clone(), [w, h]),
    )?;
    Ok(())
}

pub fn log_reference_tracks(recording: &RecordingStream, tracks: &[ReferenceTrack]) -> Result<()> {
    for track in tracks {
        log_image(recording, &track.name, &track.image)?;
    }
    Ok(())
}

/// Logs one projected gaze point for a track at the given frame.
pub fn log_projection(
    recording: &RecordingStream,
    track_idx: usize,
    track_name: &str,
    frame_index: usize,
    coord: (i32, i32),
) -> Result<()> {
    recording.set_time("frame", rerun::TimeCell::from_sequence(frame_index as i64));
    let pts = rerun_shift(&[(coord.0 as f32, coord.1 as f32)]);
    recording.log(
        format!("{}/gaze", track_name),
        &rerun::Points2D::new(pts)
            .with_colors([track_color(track_idx)])
            .with_radii([rerun::Radius::new_ui_points(5.0)]),
    )?;
    Ok(())
}
