use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::alert::AlertRecord;
use crate::db::{
    connection::Database,
    helpers::{format_timestamp, parse_datetime, to_limit, to_u32},
    models::StoredAlert,
};

fn row_to_alert(row: &Row) -> Result<StoredAlert> {
    let timestamp: String = row.get("timestamp")?;

    Ok(StoredAlert {
        id: row.get("id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        region: row.get("region")?,
        count: to_u32(row.get("count")?, "count")?,
        max_count: to_u32(row.get("max_count")?, "max_count")?,
        message: row.get("message")?,
        source_label: row.get("source_label")?,
    })
}

impl Database {
    pub async fn insert_alert(&self, alert: &AlertRecord, source_label: &str) -> Result<i64> {
        let record = alert.clone();
        let source_label = source_label.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO alerts (timestamp, region, count, max_count, message, source_label)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    format_timestamp(&record.timestamp),
                    record.region,
                    i64::from(record.count),
                    i64::from(record.max_count),
                    record.message,
                    source_label,
                ],
            )
            .context("failed to insert alert")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Newest first.
    pub async fn recent_alerts(&self, limit: usize) -> Result<Vec<StoredAlert>> {
        let limit = to_limit(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, region, count, max_count, message, source_label
                 FROM alerts
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut alerts = Vec::new();
            while let Some(row) = rows.next()? {
                alerts.push(row_to_alert(row)?);
            }
            Ok(alerts)
        })
        .await
    }
}
