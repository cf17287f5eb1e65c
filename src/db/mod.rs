//! Append-only history of snapshots, alerts and per-source aggregates.

mod connection;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::{
    DetectionData, DetectionRecord, DetectionSummary, StoredAlert, VideoRecord, VideoStats,
};
