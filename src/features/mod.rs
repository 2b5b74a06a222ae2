pub mod extractor;
pub mod homography;
pub mod matcher;

pub use extractor::*;
pub use homography::*;
pub use matcher::*;
