//! End-of-stream aggregates for one processed source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStats {
    pub filename: String,
    pub total_frames: u64,
    pub duration_seconds: f64,
    pub avg_people_count: f64,
}

impl VideoStats {
    /// `None` when no frame was analyzed. Duration is zero when the
    /// source frame rate is unknown.
    pub fn from_people_counts(
        filename: impl Into<String>,
        total_frames: u64,
        fps: Option<f64>,
        people_counts: &[u32],
    ) -> Option<Self> {
        if people_counts.is_empty() {
            return None;
        }

        let sum: u64 = people_counts.iter().map(|&c| u64::from(c)).sum();
        let duration_seconds = match fps {
            Some(fps) if fps > 0.0 => total_frames as f64 / fps,
            _ => 0.0,
        };

        Some(Self {
            filename: filename.into(),
            total_frames,
            duration_seconds,
            avg_people_count: sum as f64 / people_counts.len() as f64,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: i64,
    pub processed_timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub stats: VideoStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_people_and_derives_duration() {
        let stats =
            VideoStats::from_people_counts("lobby.mp4", 300, Some(30.0), &[1, 2, 3, 6]).unwrap();
        assert_eq!(stats.avg_people_count, 3.0);
        assert_eq!(stats.duration_seconds, 10.0);
        assert_eq!(stats.total_frames, 300);
    }

    #[test]
    fn unknown_fps_gives_zero_duration_and_empty_gives_none() {
        let stats = VideoStats::from_people_counts("cam", 10, None, &[4]).unwrap();
        assert_eq!(stats.duration_seconds, 0.0);
        assert!(VideoStats::from_people_counts("cam", 10, Some(25.0), &[]).is_none());
    }
}
