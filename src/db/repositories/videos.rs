use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_timestamp, parse_datetime, to_i64, to_limit, to_u64},
    models::{VideoRecord, VideoStats},
};

fn row_to_video(row: &Row) -> Result<VideoRecord> {
    let processed_timestamp: String = row.get("processed_timestamp")?;

    Ok(VideoRecord {
        id: row.get("id")?,
        processed_timestamp: parse_datetime(&processed_timestamp, "processed_timestamp")?,
        stats: VideoStats {
            filename: row.get("filename")?,
            total_frames: to_u64(row.get("total_frames")?, "total_frames")?,
            duration_seconds: row.get("duration_seconds")?,
            avg_people_count: row.get("avg_people_count")?,
        },
    })
}

impl Database {
    pub async fn insert_video_stats(&self, stats: &VideoStats) -> Result<i64> {
        let record = stats.clone();
        let processed_timestamp = format_timestamp(&Utc::now());
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO videos (filename, processed_timestamp, total_frames, duration_seconds, avg_people_count)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.filename,
                    processed_timestamp,
                    to_i64(record.total_frames)?,
                    record.duration_seconds,
                    record.avg_people_count,
                ],
            )
            .context("failed to insert video stats")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Newest first.
    pub async fn recent_videos(&self, limit: usize) -> Result<Vec<VideoRecord>> {
        let limit = to_limit(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, filename, processed_timestamp, total_frames, duration_seconds, avg_people_count
                 FROM videos
                 ORDER BY processed_timestamp DESC, id DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut videos = Vec::new();
            while let Some(row) = rows.next()? {
                videos.push(row_to_video(row)?);
            }
            Ok(videos)
        })
        .await
    }
}
