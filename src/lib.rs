//! Region occupancy analysis for object-detection streams.
//!
//! Detections from an external model are counted per configured polygon,
//! compared against per-region limits, turned into cooldown-limited alerts
//! and sampled into a SQLite history.

pub mod alert;
pub mod analysis;
pub mod batch;
pub mod db;
pub mod detection;
pub mod pipeline;
pub mod settings;
pub mod utils;

pub use alert::{AlertManager, AlertRecord};
pub use analysis::{analyze, AnalysisError, AnalysisSnapshot, Region, RegionAnalyzer};
pub use batch::{process_directory, BatchKind, BatchOptions, BatchReport};
pub use db::Database;
pub use detection::{Detection, Detector};
pub use pipeline::{FrameOutcome, FrameSource, MonitorSession, SessionSummary, SourceError};
pub use settings::{Settings, SettingsStore};
pub use utils::logging::init_logging;

/// Opens the history store named in `settings`.
pub fn open_database(settings: &Settings) -> anyhow::Result<Database> {
    Database::new(settings.database.path.clone())
}
