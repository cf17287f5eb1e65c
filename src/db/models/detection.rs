//! Persisted analysis snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisSnapshot;
use crate::detection::Detection;

/// Reduced view of a detection kept in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub class_name: String,
    pub confidence: f32,
    pub center: (i32, i32),
}

/// Serialized into the `detection_data` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionData {
    pub counts: BTreeMap<String, u32>,
    pub anomalies: BTreeMap<String, bool>,
    pub detections: Vec<DetectionSummary>,
}

impl DetectionData {
    pub fn new(snapshot: &AnalysisSnapshot, detections: &[Detection]) -> Self {
        Self {
            counts: snapshot.counts.clone(),
            anomalies: snapshot.anomalies.clone(),
            detections: detections
                .iter()
                .map(|d| DetectionSummary {
                    class_name: d.class_name.clone(),
                    confidence: d.confidence,
                    center: d.center,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub total_count: u32,
    pub total_people: u32,
    pub source_label: String,
    pub detection_data: DetectionData,
}
