pub mod alert;
pub mod detection;
pub mod video;

pub use alert::StoredAlert;
pub use detection::{DetectionData, DetectionRecord, DetectionSummary};
pub use video::{VideoRecord, VideoStats};
