pub mod session;
pub mod source;

pub use session::{FrameOutcome, MonitorSession, SessionSummary};
pub use source::{is_image_path, FrameSource, ImageFile, ImageSequence, MemorySource, SourceError};
