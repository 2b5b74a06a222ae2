use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GazeError>;

#[derive(Debug, Error)]
pub enum GazeError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("gaze table line {line}: {message}")]
    GazeTable { line: usize, message: String },

    #[error("gaze timestamps decrease at sample {index}: {previous} s -> {current} s")]
    NonMonotonic {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("gaze sample {index} has a non-finite timestamp")]
    NonFiniteTimestamp { index: usize },

    #[error("frame source error: {0}")]
    Source(String),

    #[error("frame {index} is {found:?}, session resolution is {expected:?}")]
    FrameSize {
        index: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("visualization stream error: {0}")]
    Visualization(#[from] rerun::RecordingStreamError),
}

impl GazeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GazeError::Io {
            path: path.into(),
            source,
        }
    }
}
