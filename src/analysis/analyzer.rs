use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AnalysisError;
use super::geometry::{percentage_to_pixels, point_in_polygon};
use super::region::{validate_regions, Region};
use crate::detection::Detection;

/// One frame's analysis result. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub timestamp: DateTime<Utc>,
    pub counts: BTreeMap<String, u32>,
    pub anomalies: BTreeMap<String, bool>,
    /// Sum of region counts. Overlapping regions count a detection more
    /// than once, so this can exceed the number of detections.
    pub total_count: u32,
    /// Person detections anywhere in the frame, regardless of regions.
    pub total_people: u32,
}

impl AnalysisSnapshot {
    pub fn is_anomalous(&self, region: &str) -> bool {
        self.anomalies.get(region).copied().unwrap_or(false)
    }

    pub fn anomalous_regions(&self) -> impl Iterator<Item = &str> {
        self.anomalies
            .iter()
            .filter(|(_, &flag)| flag)
            .map(|(name, _)| name.as_str())
    }
}

fn validate_detections(detections: &[Detection]) -> Result<(), AnalysisError> {
    for (index, detection) in detections.iter().enumerate() {
        if detection.class_name.is_empty() {
            return Err(AnalysisError::InvalidDetection {
                index,
                reason: "empty class name".into(),
            });
        }
        if !detection.confidence.is_finite() || !(0.0..=1.0).contains(&detection.confidence) {
            return Err(AnalysisError::InvalidDetection {
                index,
                reason: format!("confidence {} outside [0, 1]", detection.confidence),
            });
        }
    }
    Ok(())
}

/// Counts detection centers per region and flags regions over capacity.
///
/// Fails without producing a partial result if any region or detection
/// breaks its contract, or if the frame size is not positive.
pub fn analyze(
    detections: &[Detection],
    regions: &[Region],
    frame_width: i64,
    frame_height: i64,
) -> Result<AnalysisSnapshot, AnalysisError> {
    validate_regions(regions)?;
    validate_detections(detections)?;

    let mut counts = BTreeMap::new();
    let mut anomalies = BTreeMap::new();

    for region in regions {
        let pixel_polygon = percentage_to_pixels(&region.polygon, frame_width, frame_height)?;
        let count = detections
            .iter()
            .filter(|d| {
                point_in_polygon(
                    (i64::from(d.center.0), i64::from(d.center.1)),
                    &pixel_polygon,
                )
            })
            .count() as u32;

        counts.insert(region.name.clone(), count);
        anomalies.insert(region.name.clone(), count > region.max_count);
    }

    let total_count = counts.values().sum();
    let total_people = detections.iter().filter(|d| d.is_person()).count() as u32;

    Ok(AnalysisSnapshot {
        timestamp: Utc::now(),
        counts,
        anomalies,
        total_count,
        total_people,
    })
}

/// Holds a session's validated regions.
#[derive(Debug, Clone)]
pub struct RegionAnalyzer {
    regions: Vec<Region>,
}

impl RegionAnalyzer {
    pub fn new(regions: Vec<Region>) -> Result<Self, AnalysisError> {
        validate_regions(&regions)?;
        Ok(Self { regions })
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn analyze(
        &self,
        detections: &[Detection],
        frame_width: i64,
        frame_height: i64,
    ) -> Result<AnalysisSnapshot, AnalysisError> {
        analyze(detections, &self.regions, frame_width, frame_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::geometry::FALLBACK_FRAME_SIZE;
    use rand::Rng;

    fn person_at(x: i32, y: i32) -> Detection {
        Detection {
            class_name: "person".into(),
            confidence: 0.8,
            bbox: (x - 5, y - 5, x + 5, y + 5),
            center: (x, y),
        }
    }

    fn rect(name: &str, x1: f64, y1: f64, x2: f64, y2: f64, max_count: u32) -> Region {
        Region::new(name, vec![(x1, y1), (x2, y1), (x2, y2), (x1, y2)], max_count)
    }

    #[test]
    fn counts_only_detections_inside_each_region() {
        let regions = vec![rect("left", 0.0, 0.0, 50.0, 100.0, 10)];
        let mut detections: Vec<_> = (0..4).map(|i| person_at(100 + i * 50, 500)).collect();
        detections.push(person_at(900, 500));
        detections.push(Detection::from_bbox("backpack", 0.7, (880, 480, 920, 520)));

        let (w, h) = FALLBACK_FRAME_SIZE;
        let snapshot = analyze(&detections, &regions, w, h).unwrap();
        assert_eq!(snapshot.counts["left"], 4);
        assert_eq!(snapshot.total_count, 4);
        assert_eq!(snapshot.total_people, 5);
        assert!(!snapshot.is_anomalous("left"));
    }

    #[test]
    fn overlapping_regions_double_count() {
        let regions = vec![
            rect("a", 0.0, 0.0, 60.0, 100.0, 0),
            rect("b", 40.0, 0.0, 100.0, 100.0, 5),
        ];
        let snapshot = analyze(&[person_at(500, 500)], &regions, 1000, 1000).unwrap();
        assert_eq!(snapshot.counts["a"], 1);
        assert_eq!(snapshot.counts["b"], 1);
        assert_eq!(snapshot.total_count, 2);
        assert_eq!(snapshot.anomalous_regions().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn anomaly_matches_strict_threshold_for_random_inputs() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let max_count = rng.gen_range(0..6);
            let people = rng.gen_range(0..10);
            let regions = vec![rect("zone", 10.0, 10.0, 90.0, 90.0, max_count)];
            let detections: Vec<_> = (0..people).map(|i| person_at(200 + i * 10, 500)).collect();

            let snapshot = analyze(&detections, &regions, 1000, 1000).unwrap();
            assert_eq!(snapshot.counts["zone"], people as u32);
            assert_eq!(snapshot.anomalies["zone"], snapshot.counts["zone"] > max_count);
        }
    }

    #[test]
    fn count_equal_to_capacity_is_not_anomalous() {
        let regions = vec![rect("zone", 0.0, 0.0, 100.0, 100.0, 2)];
        let detections = [person_at(10, 10), person_at(20, 20)];
        let snapshot = analyze(&detections, &regions, 100, 100).unwrap();
        assert_eq!(snapshot.counts["zone"], 2);
        assert!(!snapshot.anomalies["zone"]);
    }

    #[test]
    fn membership_is_scale_invariant() {
        let regions = vec![
            Region::new("tri", vec![(10.0, 10.0), (80.0, 20.0), (30.0, 90.0)], 1),
            rect("box", 50.0, 50.0, 75.0, 75.0, 1),
        ];
        let small: Vec<_> = [(20, 20), (35, 50), (60, 60), (90, 10), (40, 70)]
            .iter()
            .map(|&(x, y)| person_at(x, y))
            .collect();
        let doubled: Vec<_> = small
            .iter()
            .map(|d| person_at(d.center.0 * 2, d.center.1 * 2))
            .collect();

        let a = analyze(&small, &regions, 100, 100).unwrap();
        let b = analyze(&doubled, &regions, 200, 200).unwrap();
        assert_eq!(a.counts, b.counts);
        assert_eq!(a.anomalies, b.anomalies);
    }

    #[test]
    fn repeated_analysis_is_identical() {
        let analyzer = RegionAnalyzer::new(vec![rect("zone", 0.0, 0.0, 50.0, 50.0, 1)]).unwrap();
        let detections = vec![person_at(100, 100), person_at(200, 200), person_at(900, 900)];

        let first = analyzer.analyze(&detections, 1000, 1000).unwrap();
        let second = analyzer.analyze(&detections, 1000, 1000).unwrap();
        assert_eq!(
            serde_json::to_string(&(&first.counts, &first.anomalies)).unwrap(),
            serde_json::to_string(&(&second.counts, &second.anomalies)).unwrap()
        );
        assert_eq!(first.total_people, second.total_people);
    }

    #[test]
    fn malformed_region_rejects_the_frame() {
        let regions = vec![
            rect("ok", 0.0, 0.0, 100.0, 100.0, 1),
            Region::new("broken", vec![(0.0, 0.0), (1.0, 1.0)], 1),
        ];
        assert!(matches!(
            analyze(&[person_at(1, 1)], &regions, 100, 100),
            Err(AnalysisError::TooFewVertices { .. })
        ));
    }

    #[test]
    fn invalid_detection_rejects_the_frame() {
        let regions = vec![rect("ok", 0.0, 0.0, 100.0, 100.0, 1)];
        let mut bad = person_at(5, 5);
        bad.confidence = 1.5;
        assert!(matches!(
            analyze(&[person_at(1, 1), bad], &regions, 100, 100),
            Err(AnalysisError::InvalidDetection { index: 1, .. })
        ));
    }

    #[test]
    fn zero_frame_size_is_rejected() {
        let regions = vec![rect("ok", 0.0, 0.0, 100.0, 100.0, 1)];
        assert!(analyze(&[], &regions, 0, 0).is_err());
    }
}
