use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result};
use chrono::Utc;
use image::RgbImage;
use tokio_util::sync::CancellationToken;

use crate::{
    alert::{AlertManager, AlertRecord},
    analysis::{render_overlay, AnalysisSnapshot, RegionAnalyzer, FALLBACK_FRAME_SIZE},
    db::{Database, VideoStats},
    detection::{Detection, Detector},
    settings::{PipelineSettings, Settings},
};

use super::source::FrameSource;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Analyzed frames between two progress log lines.
const PROGRESS_EVERY_ANALYZED: u64 = 20;

#[derive(Debug, Clone)]
pub enum FrameOutcome {
    /// Outside the analysis stride.
    Skipped,
    Analyzed {
        snapshot: AnalysisSnapshot,
        alerts: Vec<AlertRecord>,
        /// Whether the snapshot row was written.
        persisted: bool,
    },
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub label: String,
    pub frames_seen: u64,
    pub frames_analyzed: u64,
    pub max_people_count: Option<u32>,
    /// Present when at least one frame was analyzed.
    pub stats: Option<VideoStats>,
}

/// One monitoring session over one source.
///
/// Frames are handled strictly one after another. The session owns its
/// alert state and counters; only the database handle is shared with
/// other sessions.
pub struct MonitorSession {
    label: String,
    analyzer: RegionAnalyzer,
    alerts: AlertManager,
    db: Database,
    analyze_every: u64,
    persist_every: u64,
    output_dir: Option<PathBuf>,
    frames_seen: u64,
    frames_analyzed: u64,
    people_counts: Vec<u32>,
    fps: Option<f64>,
    started: Instant,
    finished: bool,
}

impl MonitorSession {
    pub fn new(label: impl Into<String>, settings: &Settings, db: Database) -> Result<Self> {
        settings.validate()?;
        let analyzer = RegionAnalyzer::new(settings.region_list())
            .context("invalid region configuration")?;
        let alerts = AlertManager::new(&settings.alert, analyzer.regions());
        Ok(Self::with_parts(label, analyzer, alerts, db, &settings.pipeline))
    }

    pub fn with_parts(
        label: impl Into<String>,
        analyzer: RegionAnalyzer,
        alerts: AlertManager,
        db: Database,
        pipeline: &PipelineSettings,
    ) -> Self {
        Self {
            label: label.into(),
            analyzer,
            alerts,
            db,
            analyze_every: pipeline.analyze_every.max(1),
            persist_every: pipeline.persist_every.max(1),
            output_dir: pipeline.output_dir.clone(),
            frames_seen: 0,
            frames_analyzed: 0,
            people_counts: Vec::new(),
            fps: None,
            started: Instant::now(),
            finished: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    pub fn alert_manager(&self) -> &AlertManager {
        &self.alerts
    }

    /// Handles the next raw frame of a stream. Only every
    /// `analyze_every`-th frame reaches the detector. With an output
    /// directory configured every frame is written out, analyzed ones with
    /// the overlay.
    pub async fn process_frame(
        &mut self,
        frame: &RgbImage,
        detector: &mut dyn Detector,
    ) -> Result<FrameOutcome> {
        self.frames_seen += 1;
        if self.frames_seen % self.analyze_every != 0 {
            self.write_stream_frame(frame);
            return Ok(FrameOutcome::Skipped);
        }

        let detections = detector
            .detect(frame)
            .with_context(|| format!("detector failed on frame {}", self.frames_seen))?;
        let size = (i64::from(frame.width()), i64::from(frame.height()));
        let outcome = self.analyze_detections(&detections, Some(size)).await?;

        if self.output_dir.is_some() {
            if let FrameOutcome::Analyzed { snapshot, .. } = &outcome {
                let annotated =
                    render_overlay(frame, self.analyzer.regions(), snapshot, &detections);
                self.write_stream_frame(&annotated);
            }
        }
        Ok(outcome)
    }

    /// Analyzes a frame's detections that already passed the raw-frame
    /// stride. Without a frame size the fallback size is assumed.
    pub async fn analyze_detections(
        &mut self,
        detections: &[Detection],
        frame_size: Option<(i64, i64)>,
    ) -> Result<FrameOutcome> {
        let (width, height) = frame_size.unwrap_or(FALLBACK_FRAME_SIZE);
        let snapshot = self.analyzer.analyze(detections, width, height)?;

        self.frames_analyzed += 1;
        self.people_counts.push(snapshot.total_people);

        let alerts = self.alerts.check_and_alert(&snapshot, Utc::now());

        let persisted = if self.frames_analyzed % self.persist_every == 0 {
            self.persist_snapshot(&snapshot, detections).await
        } else {
            false
        };
        self.persist_alerts(&alerts).await;

        if self.frames_analyzed % PROGRESS_EVERY_ANALYZED == 0 {
            let elapsed = self.started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                self.frames_analyzed as f64 / elapsed
            } else {
                0.0
            };
            log_info!(
                "{}: {} frames read, {} analyzed ({:.2} analyzed fps)",
                self.label,
                self.frames_seen,
                self.frames_analyzed,
                rate
            );
        }

        Ok(FrameOutcome::Analyzed {
            snapshot,
            alerts,
            persisted,
        })
    }

    /// A still image: always analyzed and always persisted, regardless of
    /// the stream strides.
    pub async fn process_image(
        &mut self,
        image: &RgbImage,
        detector: &mut dyn Detector,
    ) -> Result<FrameOutcome> {
        let detections = detector
            .detect(image)
            .with_context(|| format!("detector failed on {}", self.label))?;
        let snapshot = self.analyzer.analyze(
            &detections,
            i64::from(image.width()),
            i64::from(image.height()),
        )?;

        let alerts = self.alerts.check_and_alert(&snapshot, Utc::now());
        let persisted = self.persist_snapshot(&snapshot, &detections).await;
        self.persist_alerts(&alerts).await;

        log_info!(
            "{}: {} people, region counts {:?}",
            self.label,
            snapshot.total_people,
            snapshot.counts
        );

        if let Some(path) = self.processed_path() {
            let annotated = render_overlay(image, self.analyzer.regions(), &snapshot, &detections);
            match save_output(&annotated, &path) {
                Ok(()) => log_info!("annotated image written to {}", path.display()),
                Err(err) => log_error!("{}: {err:?}", self.label),
            }
        }

        Ok(FrameOutcome::Analyzed {
            snapshot,
            alerts,
            persisted,
        })
    }

    /// Drains `source` until it is exhausted or `cancel` fires, then
    /// flushes the aggregate statistics. A failing frame stops the run;
    /// statistics for the frames handled so far are still flushed.
    pub async fn run(
        &mut self,
        source: &mut dyn FrameSource,
        detector: &mut dyn Detector,
        cancel: &CancellationToken,
    ) -> Result<SessionSummary> {
        self.fps = source.fps();
        log_info!("{}: session started", self.label);

        let drained = self.drain(source, detector, cancel).await;
        let summary = self.finish().await;
        drained.map(|()| summary)
    }

    async fn drain(
        &mut self,
        source: &mut dyn FrameSource,
        detector: &mut dyn Detector,
        cancel: &CancellationToken,
    ) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                log_info!("{}: stop requested after {} frames", self.label, self.frames_seen);
                return Ok(());
            }

            let Some(frame) = source
                .next_frame()
                .with_context(|| format!("failed to read from {}", self.label))?
            else {
                return Ok(());
            };

            self.process_frame(&frame, detector).await?;
        }
    }

    /// Computes and stores the aggregate row once. Later calls only
    /// return the summary again without writing.
    pub async fn finish(&mut self) -> SessionSummary {
        let stats = VideoStats::from_people_counts(
            self.label.clone(),
            self.frames_seen,
            self.fps,
            &self.people_counts,
        );

        if !self.finished {
            self.finished = true;
            if let Some(stats) = &stats {
                if let Err(err) = self.db.insert_video_stats(stats).await {
                    log_error!("{}: failed to persist video stats: {err:?}", self.label);
                }
                log_info!(
                    "{}: {} frames, {} analyzed, avg people {:.2}, max people {}",
                    self.label,
                    self.frames_seen,
                    self.frames_analyzed,
                    stats.avg_people_count,
                    self.people_counts.iter().max().copied().unwrap_or_default()
                );
            }
        }

        SessionSummary {
            label: self.label.clone(),
            frames_seen: self.frames_seen,
            frames_analyzed: self.frames_analyzed,
            max_people_count: self.people_counts.iter().max().copied(),
            stats,
        }
    }

    /// `<output_dir>/processed_<label>`: the annotated still, or the
    /// directory of written stream frames.
    fn processed_path(&self) -> Option<PathBuf> {
        self.output_dir
            .as_ref()
            .map(|dir| dir.join(format!("processed_{}", self.label)))
    }

    /// Output failures are logged and the stream goes on.
    fn write_stream_frame(&self, frame: &RgbImage) {
        let Some(dir) = self.processed_path() else {
            return;
        };
        let path = dir.join(format!("frame_{:06}.png", self.frames_seen));
        if let Err(err) = save_output(frame, &path) {
            log_error!("{}: {err:?}", self.label);
        }
    }

    async fn persist_snapshot(
        &self,
        snapshot: &AnalysisSnapshot,
        detections: &[Detection],
    ) -> bool {
        match self.db.insert_detection(snapshot, detections, &self.label).await {
            Ok(_) => true,
            Err(err) => {
                log_error!("{}: failed to persist snapshot: {err:?}", self.label);
                false
            }
        }
    }

    async fn persist_alerts(&self, alerts: &[AlertRecord]) {
        for alert in alerts {
            if let Err(err) = self.db.insert_alert(alert, &self.label).await {
                log_error!(
                    "{}: failed to persist alert for '{}': {err:?}",
                    self.label,
                    alert.region
                );
            }
        }
    }
}

fn save_output(image: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}
