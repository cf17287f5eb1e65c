use thiserror::Error;

/// Data-contract violations that reject a whole frame.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("region '{region}' has {vertices} vertices, at least 3 are required")]
    TooFewVertices { region: String, vertices: usize },

    #[error("region '{region}' vertex {index} ({x}, {y}) is outside the 0-100 percentage range")]
    CoordinateOutOfRange {
        region: String,
        index: usize,
        x: f64,
        y: f64,
    },

    #[error("region '{0}' is defined more than once")]
    DuplicateRegion(String),

    #[error("frame size {width}x{height} is not positive")]
    InvalidFrameSize { width: i64, height: i64 },

    #[error("detection {index} is invalid: {reason}")]
    InvalidDetection { index: usize, reason: String },
}
