use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::analysis::AnalysisSnapshot;
use crate::db::{
    connection::Database,
    helpers::{format_timestamp, parse_datetime, to_limit, to_u32},
    models::{DetectionData, DetectionRecord},
};
use crate::detection::Detection;

fn row_to_detection(row: &Row) -> Result<DetectionRecord> {
    let timestamp: String = row.get("timestamp")?;
    let detection_data: String = row.get("detection_data")?;

    Ok(DetectionRecord {
        id: row.get("id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        total_count: to_u32(row.get("total_count")?, "total_count")?,
        total_people: to_u32(row.get("total_people")?, "total_people")?,
        source_label: row.get("source_label")?,
        detection_data: serde_json::from_str(&detection_data)
            .context("failed to parse detection_data")?,
    })
}

impl Database {
    /// Appends one analysis snapshot. Returns the new row id.
    pub async fn insert_detection(
        &self,
        snapshot: &AnalysisSnapshot,
        detections: &[Detection],
        source_label: &str,
    ) -> Result<i64> {
        let timestamp = format_timestamp(&snapshot.timestamp);
        let total_count = i64::from(snapshot.total_count);
        let total_people = i64::from(snapshot.total_people);
        let source_label = source_label.to_string();
        let detection_data = serde_json::to_string(&DetectionData::new(snapshot, detections))
            .context("failed to serialize detection data")?;

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO detections (timestamp, total_count, total_people, source_label, detection_data)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![timestamp, total_count, total_people, source_label, detection_data],
            )
            .context("failed to insert detection")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Newest first.
    pub async fn recent_detections(&self, limit: usize) -> Result<Vec<DetectionRecord>> {
        let limit = to_limit(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, total_count, total_people, source_label, detection_data
                 FROM detections
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_detection(row)?);
            }
            Ok(records)
        })
        .await
    }
}
