//! Processing every source found in a directory.
//!
//! Each image file and each frame-sequence subdirectory gets its own
//! [`MonitorSession`]; all of them share one history store. A source that
//! fails is logged and recorded in the report, and the rest still run.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;

use crate::{
    analysis::AnalysisSnapshot,
    db::Database,
    detection::Detector,
    pipeline::{
        is_image_path, FrameOutcome, FrameSource, ImageFile, ImageSequence, MonitorSession,
        SessionSummary,
    },
    settings::Settings,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchKind {
    /// Still images directly inside the directory.
    Images,
    /// Subdirectories holding decoded frame images.
    Sequences,
    #[default]
    All,
}

impl BatchKind {
    fn includes_images(self) -> bool {
        matches!(self, BatchKind::Images | BatchKind::All)
    }

    fn includes_sequences(self) -> bool {
        matches!(self, BatchKind::Sequences | BatchKind::All)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub kind: BatchKind,
    /// Frame rate assumed for every sequence, for the duration column.
    pub sequence_fps: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ImageResult {
    pub path: PathBuf,
    pub snapshot: AnalysisSnapshot,
    pub alerts_fired: usize,
}

#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub images: Vec<ImageResult>,
    pub sequences: Vec<SessionSummary>,
    pub failures: Vec<SourceFailure>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.images.len() + self.sequences.len()
    }
}

/// Sources are visited in file-name order.
pub async fn process_directory(
    dir: &Path,
    options: &BatchOptions,
    settings: &Settings,
    db: &Database,
    detector: &mut dyn Detector,
    cancel: &CancellationToken,
) -> Result<BatchReport> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    let mut report = BatchReport::default();

    for path in entries {
        if cancel.is_cancelled() {
            log_info!("batch over {} stopped early", dir.display());
            break;
        }

        let outcome = if path.is_file() && is_image_path(&path) && options.kind.includes_images() {
            process_image_file(&path, settings, db, detector)
                .await
                .map(|result| report.images.push(result))
        } else if path.is_dir() && options.kind.includes_sequences() {
            process_sequence_dir(&path, options.sequence_fps, settings, db, detector, cancel)
                .await
                .map(|summary| report.sequences.push(summary))
        } else {
            log_debug!("skipping {}", path.display());
            continue;
        };

        if let Err(err) = outcome {
            log_error!("failed to process {}: {err:?}", path.display());
            report.failures.push(SourceFailure {
                path,
                error: format!("{err:#}"),
            });
        }
    }

    log_info!(
        "batch over {} done: {} processed, {} failed",
        dir.display(),
        report.processed(),
        report.failures.len()
    );
    Ok(report)
}

async fn process_image_file(
    path: &Path,
    settings: &Settings,
    db: &Database,
    detector: &mut dyn Detector,
) -> Result<ImageResult> {
    let source = ImageFile::open(path)?;
    let mut session = MonitorSession::new(source.label(), settings, db.clone())?;
    let image = source
        .into_image()
        .with_context(|| format!("{} yielded no image", path.display()))?;

    match session.process_image(&image, detector).await? {
        FrameOutcome::Analyzed { snapshot, alerts, .. } => Ok(ImageResult {
            path: path.to_path_buf(),
            snapshot,
            alerts_fired: alerts.len(),
        }),
        FrameOutcome::Skipped => bail!("{} was not analyzed", path.display()),
    }
}

async fn process_sequence_dir(
    path: &Path,
    fps: Option<f64>,
    settings: &Settings,
    db: &Database,
    detector: &mut dyn Detector,
    cancel: &CancellationToken,
) -> Result<SessionSummary> {
    let mut source = ImageSequence::open(path, fps)?;
    let label = source.label().to_string();
    let mut session = MonitorSession::new(label, settings, db.clone())?;
    session.run(&mut source, detector, cancel).await
}
