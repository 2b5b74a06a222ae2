#![allow(dead_code)]

use gaze_mapping::types::{Frame, GazeSample};
use image::{Rgb, RgbImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Random overlapping rectangles of random gray levels on a mid-gray field.
pub fn textured_image(w: u32, h: u32, seed: u64) -> RgbImage {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut img = RgbImage::from_pixel(w, h, Rgb([128, 128, 128]));
    for _ in 0..(w * h / 400) {
        let x0 = rng.random_range(0..w);
        let y0 = rng.random_range(0..h);
        let rw = rng.random_range(6..30);
        let rh = rng.random_range(6..30);
        let level: u8 = rng.random_range(0..=255);
        for y in y0..(y0 + rh).min(h) {
            for x in x0..(x0 + rw).min(w) {
                img.put_pixel(x, y, Rgb([level, level, level]));
            }
        }
    }
    img
}

/// `patch` copied onto a uniform canvas at an integer offset.
pub fn paste(canvas_w_h: (u32, u32), patch: Option<(&RgbImage, (u32, u32))>) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(canvas_w_h.0, canvas_w_h.1, Rgb([128, 128, 128]));
    if let Some((patch, (ox, oy))) = patch {
        for (x, y, p) in patch.enumerate_pixels() {
            if x + ox < canvas_w_h.0 && y + oy < canvas_w_h.1 {
                canvas.put_pixel(x + ox, y + oy, *p);
            }
        }
    }
    canvas
}

/// Blank frames stamped at the given milliseconds.
pub fn blank_frames(timestamps_ms: &[f64], w_h: (u32, u32)) -> Vec<Frame> {
    timestamps_ms
        .iter()
        .enumerate()
        .map(|(i, &t)| Frame::new(i, t, RgbImage::new(w_h.0, w_h.1)))
        .collect()
}

/// Valid samples at the given milliseconds, all at `position`.
pub fn gaze_at(timestamps_ms: &[f64], position: (f64, f64)) -> Vec<GazeSample> {
    timestamps_ms
        .iter()
        .map(|&t| GazeSample::valid(t / 1000.0, position.0, position.1))
        .collect()
}

pub fn range_ms(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}
