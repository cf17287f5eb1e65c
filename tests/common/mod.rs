#![allow(dead_code)]

use std::collections::BTreeMap;

use anyhow::Result;
use crowdwatch::{
    db::Database,
    settings::{AlertMethod, RegionSettings, Settings},
    Detection,
};
use image::RgbImage;
use tempfile::TempDir;

pub const FRAME_SIDE: u32 = 10;

/// Left half of the frame, door in the top-left corner.
pub fn settings(left_max: u32, door_max: u32) -> Settings {
    let mut regions = BTreeMap::new();
    regions.insert(
        "left".to_string(),
        RegionSettings {
            coordinates: vec![(0.0, 0.0), (50.0, 0.0), (50.0, 100.0), (0.0, 100.0)],
            max_count: left_max,
        },
    );
    regions.insert(
        "door".to_string(),
        RegionSettings {
            coordinates: vec![(0.0, 0.0), (40.0, 0.0), (40.0, 40.0), (0.0, 40.0)],
            max_count: door_max,
        },
    );

    let mut settings = Settings {
        regions,
        ..Settings::default()
    };
    settings.alert.methods = vec![AlertMethod::Log];
    settings
}

pub fn temp_database() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("history.sqlite3")).unwrap();
    (dir, db)
}

pub fn frames(n: usize) -> Vec<RgbImage> {
    (0..n).map(|_| RgbImage::new(FRAME_SIDE, FRAME_SIDE)).collect()
}

/// `n` people standing at (2, 2): inside both the door and the left half.
pub fn people(n: usize) -> Vec<Detection> {
    (0..n)
        .map(|_| Detection::from_bbox("person", 0.9, (1, 1, 3, 3)))
        .collect()
}

pub fn fixed_detector(n: usize) -> impl FnMut(&RgbImage) -> Result<Vec<Detection>> + Send {
    move |_frame: &RgbImage| Ok(people(n))
}
