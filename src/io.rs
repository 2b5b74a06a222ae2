use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::config::PipelineConfig;
use crate::error::{GazeError, Result};

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize, P: AsRef<Path>>(output_path: P, object: &T) -> Result<()> {
    let path = output_path.as_ref();
    let j = serde_json::to_string_pretty(object)?;
    std::fs::write(path, j).map_err(|e| GazeError::io(path, e))
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned, P: AsRef<Path>>(file_path: P) -> Result<T> {
    let path = file_path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| GazeError::io(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn config_from_json<P: AsRef<Path>>(file_path: P) -> Result<PipelineConfig> {
    let config: PipelineConfig = object_from_json(file_path)?;
    config.validate()?;
    Ok(config)
}

/// Projected gaze rows, one per gaze sample, `[-1, -1]` where undefined.
pub fn write_points<P: AsRef<Path>>(output_path: P, rows: &[[i32; 2]]) -> Result<()> {
    object_to_json(output_path, &rows)
}

pub fn read_points<P: AsRef<Path>>(file_path: P) -> Result<Vec<[i32; 2]>> {
    object_from_json(file_path)
}

/// Destination for output frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;
    /// Flushes whatever the sink still holds. Called once at the end of a run.
    fn finish(&mut self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SequenceInfo {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub frame_count: usize,
}

/// Numbered PNG frames in a directory plus a `sequence.json` description.
pub struct ImageSequenceSink {
    folder: PathBuf,
    fps: f64,
    frame_size: Option<(u32, u32)>,
    written: usize,
}

impl ImageSequenceSink {
    pub fn create<P: AsRef<Path>>(folder: P, fps: f64) -> Result<ImageSequenceSink> {
        let folder = folder.as_ref().to_path_buf();
        std::fs::create_dir_all(&folder).map_err(|e| GazeError::io(&folder, e))?;
        Ok(ImageSequenceSink {
            folder,
            fps,
            frame_size: None,
            written: 0,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

impl FrameSink for ImageSequenceSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let size = *self.frame_size.get_or_insert(frame.dimensions());
        if size != frame.dimensions() {
            return Err(GazeError::FrameSize {
                index: self.written,
                expected: size,
                found: frame.dimensions(),
            });
        }
        frame.save(self.folder.join(format!("{:06}.png", self.written)))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let (width, height) = self.frame_size.unwrap_or((0, 0));
        let info = SequenceInfo {
            fps: self.fps,
            width,
            height,
            frame_count: self.written,
        };
        object_to_json(self.folder.join("sequence.json"), &info)
    }
}

/// Keeps every written frame in memory.
#[derive(Default)]
pub struct MemoryFrameSink {
    pub frames: Vec<RgbImage>,
    pub finished: bool,
}

impl FrameSink for MemoryFrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
