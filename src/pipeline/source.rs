//! Where frames come from.
//!
//! Decoding video containers is left to external tooling; a decoded video
//! is consumed here as a directory of ordered frame images, or through any
//! custom [`FrameSource`] (a live device wrapper, for instance).

use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use image::RgbImage;
use thiserror::Error;

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source {path} is unavailable: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    #[error("failed to decode frame {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn label_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn decode(path: &Path) -> Result<RgbImage, SourceError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| match source {
            image::ImageError::IoError(err) => SourceError::Unavailable {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
            source => SourceError::Decode {
                path: path.to_path_buf(),
                source,
            },
        })
}

/// A finite or unbounded sequence of frames.
pub trait FrameSource: Send {
    /// Name recorded with persisted rows.
    fn label(&self) -> &str;

    /// Native frame rate, when known.
    fn fps(&self) -> Option<f64> {
        None
    }

    /// Blocks until the next frame is available. `None` once exhausted.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError>;
}

/// One still image, decoded at open time.
pub struct ImageFile {
    label: String,
    frame: Option<RgbImage>,
}

impl ImageFile {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let frame = decode(path)?;
        Ok(Self {
            label: label_for(path),
            frame: Some(frame),
        })
    }

    /// Takes the image out for still-image processing.
    pub fn into_image(self) -> Option<RgbImage> {
        self.frame
    }
}

impl FrameSource for ImageFile {
    fn label(&self) -> &str {
        &self.label
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        Ok(self.frame.take())
    }
}

/// Directory of frame images played back in file-name order.
pub struct ImageSequence {
    label: String,
    fps: Option<f64>,
    frames: VecDeque<PathBuf>,
}

impl ImageSequence {
    pub fn open(dir: &Path, fps: Option<f64>) -> Result<Self, SourceError> {
        let unavailable = |reason: String| SourceError::Unavailable {
            path: dir.to_path_buf(),
            reason,
        };

        let entries = fs::read_dir(dir).map_err(|err| unavailable(err.to_string()))?;
        let mut frames = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| unavailable(err.to_string()))?.path();
            if path.is_file() && is_image_path(&path) {
                frames.push(path);
            }
        }

        if frames.is_empty() {
            return Err(unavailable("no frame images found".into()));
        }
        frames.sort();

        Ok(Self {
            label: label_for(dir),
            fps,
            frames: frames.into(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ImageSequence {
    fn label(&self) -> &str {
        &self.label
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        match self.frames.pop_front() {
            Some(path) => decode(&path).map(Some),
            None => Ok(None),
        }
    }
}

/// Frames already in memory, e.g. handed over by a capture thread.
pub struct MemorySource {
    label: String,
    fps: Option<f64>,
    frames: VecDeque<RgbImage>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>, fps: Option<f64>, frames: Vec<RgbImage>) -> Self {
        Self {
            label: label.into(),
            fps,
            frames: frames.into(),
        }
    }
}

impl FrameSource for MemorySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_image_extensions() {
        assert!(is_image_path(Path::new("a/b/frame_001.PNG")));
        assert!(is_image_path(Path::new("still.jpeg")));
        assert!(!is_image_path(Path::new("clip.mp4")));
        assert!(!is_image_path(Path::new("noext")));
    }

    #[test]
    fn sequence_plays_frames_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let named = [("frame_002.png", 20u8), ("frame_001.png", 10), ("frame_003.png", 30)];
        for (name, shade) in named {
            RgbImage::from_pixel(4, 3, image::Rgb([shade, 0, 0]))
                .save(dir.path().join(name))
                .unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut seq = ImageSequence::open(dir.path(), Some(25.0)).unwrap();
        assert_eq!(seq.remaining(), 3);
        assert_eq!(seq.fps(), Some(25.0));

        let shades: Vec<u8> = std::iter::from_fn(|| seq.next_frame().unwrap())
            .map(|frame| frame.get_pixel(0, 0)[0])
            .collect();
        assert_eq!(shades, vec![10, 20, 30]);
    }

    #[test]
    fn missing_sources_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageSequence::open(&dir.path().join("nope"), None),
            Err(SourceError::Unavailable { .. })
        ));
        assert!(matches!(
            ImageSequence::open(dir.path(), None),
            Err(SourceError::Unavailable { .. })
        ));
        assert!(matches!(
            ImageFile::open(&dir.path().join("missing.png")),
            Err(SourceError::Unavailable { .. })
        ));
    }

    #[test]
    fn image_file_yields_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        RgbImage::new(8, 6).save(&path).unwrap();

        let mut source = ImageFile::open(&path).unwrap();
        assert_eq!(source.label(), "still.png");
        assert_eq!(source.next_frame().unwrap().unwrap().dimensions(), (8, 6));
        assert!(source.next_frame().unwrap().is_none());
    }
}
