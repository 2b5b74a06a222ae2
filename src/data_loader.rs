use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use glob::glob;
use image::ImageReader;

use crate::error::{GazeError, Result};
use crate::types::Frame;

/// Ordered stream of decoded scene frames.
pub trait FrameSource {
    fn frame_count(&self) -> usize;
    /// Nominal frame rate.
    fn fps(&self) -> f64;
    /// Resolution shared by every frame of the session.
    fn frame_size(&self) -> (u32, u32);
    /// The next frame, or `None` at the end of the stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Parses the timestamp from a file path.
///
/// Assumes the filename (without extension) is a timestamp in nanoseconds.
fn path_to_timestamp(path: &Path) -> Option<i64> {
    path.file_stem()?.to_str()?.parse().ok()
}

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        for ext in &[".png", ".jpg", ".jpeg"] {
            if p.as_os_str().to_string_lossy().to_lowercase().ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

fn decode_dimensions(path: &Path) -> Result<(u32, u32)> {
    Ok(ImageReader::open(path)
        .map_err(|e| GazeError::io(path, e))?
        .into_dimensions()?)
}

/// A directory of already decoded frames, read lazily in filename order.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    timestamps_ms: Vec<f64>,
    fps: f64,
    frame_size: (u32, u32),
    next: usize,
}

impl ImageSequenceSource {
    /// Frame `i` is stamped `i * 1000 / fps` milliseconds.
    pub fn open<P: AsRef<Path>>(folder: P, fps: f64) -> Result<ImageSequenceSource> {
        let paths = Self::sorted_paths(folder.as_ref())?;
        let timestamps_ms = (0..paths.len()).map(|i| i as f64 * 1000.0 / fps).collect();
        Self::from_parts(paths, timestamps_ms, fps)
    }

    /// Euroc-style naming: each file stem is a nanosecond timestamp.
    /// Timestamps are made relative to the first frame.
    pub fn open_timestamped<P: AsRef<Path>>(folder: P, fps: f64) -> Result<ImageSequenceSource> {
        let paths = Self::sorted_paths(folder.as_ref())?;
        let stamps_ns = paths
            .iter()
            .map(|p| {
                path_to_timestamp(p).ok_or_else(|| {
                    GazeError::Source(format!("{} is not named by a timestamp", p.display()))
                })
            })
            .collect::<Result<Vec<i64>>>()?;
        let mut order: Vec<usize> = (0..paths.len()).collect();
        order.sort_by_key(|&i| stamps_ns[i]);
        let first = stamps_ns[order[0]];
        let timestamps_ms = order
            .iter()
            .map(|&i| (stamps_ns[i] - first) as f64 / 1e6)
            .collect();
        let paths = order.iter().map(|&i| paths[i].clone()).collect();
        Self::from_parts(paths, timestamps_ms, fps)
    }

    fn sorted_paths(folder: &Path) -> Result<Vec<PathBuf>> {
        let pattern = format!("{}/*", folder.display());
        let img_paths = glob(&pattern).map_err(|e| GazeError::Source(e.to_string()))?;
        let mut sorted_path: Vec<PathBuf> = img_paths.into_iter().filter_map(img_filter).collect();
        sorted_path.sort();
        if sorted_path.is_empty() {
            return Err(GazeError::Source(format!(
                "no .png/.jpg frames in {}",
                folder.display()
            )));
        }
        log::trace!("{} frames in {}", sorted_path.len(), folder.display());
        Ok(sorted_path)
    }

    fn from_parts(paths: Vec<PathBuf>, timestamps_ms: Vec<f64>, fps: f64) -> Result<ImageSequenceSource> {
        if fps <= 0.0 {
            return Err(GazeError::Config(format!("frame rate {} must be positive", fps)));
        }
        let frame_size = decode_dimensions(&paths[0])?;
        Ok(ImageSequenceSource {
            paths,
            timestamps_ms,
            fps,
            frame_size,
            next: 0,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn frame_count(&self) -> usize {
        self.paths.len()
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        let pixels = ImageReader::open(path)
            .map_err(|e| GazeError::io(path, e))?
            .decode()?
            .to_rgb8();
        if pixels.dimensions() != self.frame_size {
            return Err(GazeError::FrameSize {
                index: self.next,
                expected: self.frame_size,
                found: pixels.dimensions(),
            });
        }
        let frame = Frame::new(self.next, self.timestamps_ms[self.next], pixels);
        self.next += 1;
        Ok(Some(frame))
    }
}

/// Frames held in memory.
pub struct MemoryFrameSource {
    frames: VecDeque<Frame>,
    total: usize,
    fps: f64,
    frame_size: (u32, u32),
}

impl MemoryFrameSource {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Result<MemoryFrameSource> {
        let frame_size = frames
            .first()
            .map(Frame::size)
            .ok_or_else(|| GazeError::Source("no frames".to_string()))?;
        if let Some(f) = frames.iter().find(|f| f.size() != frame_size) {
            return Err(GazeError::FrameSize {
                index: f.index,
                expected: frame_size,
                found: f.size(),
            });
        }
        Ok(MemoryFrameSource {
            total: frames.len(),
            frames: frames.into(),
            fps,
            frame_size,
        })
    }
}

impl FrameSource for MemoryFrameSource {
    fn frame_count(&self) -> usize {
        self.total
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}
