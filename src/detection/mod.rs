//! Boundary with the external object detector.
//!
//! The model itself lives outside this crate. Anything that can turn a
//! frame into a list of [`Detection`]s implements [`Detector`], including
//! plain closures.

use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Class name counted toward the headline people metric.
pub const PERSON_CLASS: &str = "person";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_name: String,
    pub confidence: f32,
    /// (x1, y1, x2, y2) in pixels.
    pub bbox: (i32, i32, i32, i32),
    pub center: (i32, i32),
}

impl Detection {
    /// Center is the integer midpoint of the box.
    pub fn from_bbox(
        class_name: impl Into<String>,
        confidence: f32,
        bbox: (i32, i32, i32, i32),
    ) -> Self {
        let (x1, y1, x2, y2) = bbox;
        Self {
            class_name: class_name.into(),
            confidence,
            bbox,
            center: (midpoint(x1, x2), midpoint(y1, y2)),
        }
    }

    pub fn is_person(&self) -> bool {
        self.class_name == PERSON_CLASS
    }
}

/// Widened so boxes near the i32 limits cannot overflow. The result
/// always fits back into i32.
fn midpoint(a: i32, b: i32) -> i32 {
    ((i64::from(a) + i64::from(b)) / 2) as i32
}

/// Sessions may run on any runtime worker, hence `Send`.
pub trait Detector: Send {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>>;
}

impl<F> Detector for F
where
    F: FnMut(&RgbImage) -> Result<Vec<Detection>> + Send,
{
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        self(frame)
    }
}
