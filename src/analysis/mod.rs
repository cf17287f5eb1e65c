pub mod analyzer;
pub mod error;
pub mod geometry;
pub mod overlay;
pub mod region;

pub use analyzer::{analyze, AnalysisSnapshot, RegionAnalyzer};
pub use error::AnalysisError;
pub use geometry::{percentage_to_pixels, point_in_polygon, FALLBACK_FRAME_SIZE};
pub use overlay::render_overlay;
pub use region::Region;
