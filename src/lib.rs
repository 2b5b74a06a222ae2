pub mod config;
pub mod data_loader;
pub mod error;
pub mod features;
pub mod gaze;
pub mod io;
pub mod pipeline;
pub mod projector;
pub mod sync;
pub mod track;
pub mod types;
pub mod visualization;

pub use error::{GazeError, Result};
