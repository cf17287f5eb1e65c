//! Decorated copy of a frame for live display or saved output.
//! Not part of the analysis contract.

use ab_glyph::FontRef;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};

use super::analyzer::AnalysisSnapshot;
use super::geometry::{percentage_to_pixels, PixelPoint};
use super::region::Region;
use crate::detection::Detection;

const NORMAL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const ANOMALY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const CENTER_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const TOTAL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const CENTER_RADIUS: i32 = 3;

const REGION_LABEL_SCALE: f32 = 14.0;
const TOTAL_LABEL_SCALE: f32 = 20.0;
const TOTAL_LABEL_AT: (i32, i32) = (10, 10);

static LABEL_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

fn label_font() -> Option<FontRef<'static>> {
    FontRef::try_from_slice(LABEL_FONT).ok()
}

/// Mean of the vertices, where the region label is anchored.
fn centroid(polygon: &[PixelPoint]) -> (i32, i32) {
    let n = polygon.len().max(1) as i64;
    let (sx, sy) = polygon
        .iter()
        .fold((0i64, 0i64), |(sx, sy), &(x, y)| (sx + x, sy + y));
    ((sx / n) as i32, (sy / n) as i32)
}

/// Outlines every region (red when anomalous) with its `name: count`
/// label, writes the people total in the top-left corner and marks
/// detection centers.
pub fn render_overlay(
    frame: &RgbImage,
    regions: &[Region],
    snapshot: &AnalysisSnapshot,
    detections: &[Detection],
) -> RgbImage {
    let mut canvas = frame.clone();
    let (width, height) = (i64::from(frame.width()), i64::from(frame.height()));
    let font = label_font();

    for region in regions {
        let Ok(polygon) = percentage_to_pixels(&region.polygon, width, height) else {
            continue;
        };
        let color = if snapshot.is_anomalous(&region.name) {
            ANOMALY_COLOR
        } else {
            NORMAL_COLOR
        };

        for (i, start) in polygon.iter().enumerate() {
            let end = polygon[(i + 1) % polygon.len()];
            draw_line_segment_mut(
                &mut canvas,
                (start.0 as f32, start.1 as f32),
                (end.0 as f32, end.1 as f32),
                color,
            );
        }

        if let Some(font) = &font {
            let count = snapshot.counts.get(&region.name).copied().unwrap_or_default();
            let (x, y) = centroid(&polygon);
            let text = format!("{}: {count}", region.name);
            draw_text_mut(&mut canvas, color, x, y, REGION_LABEL_SCALE, font, &text);
        }
    }

    if let Some(font) = &font {
        let text = format!("Total People: {}", snapshot.total_people);
        let (x, y) = TOTAL_LABEL_AT;
        draw_text_mut(&mut canvas, TOTAL_COLOR, x, y, TOTAL_LABEL_SCALE, font, &text);
    }

    for detection in detections {
        draw_filled_circle_mut(&mut canvas, detection.center, CENTER_RADIUS, CENTER_COLOR);
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::analyze;

    fn count_pixels(
        image: &RgbImage,
        xs: std::ops::Range<u32>,
        ys: std::ops::Range<u32>,
        matches: impl Fn(&Rgb<u8>) -> bool,
    ) -> usize {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| matches(image.get_pixel(x, y)))
            .count()
    }

    #[test]
    fn bundled_font_parses() {
        assert!(label_font().is_some());
    }

    #[test]
    fn outline_color_follows_anomaly_state() {
        let frame = RgbImage::new(100, 100);
        let regions = vec![
            Region::new("calm", vec![(10.0, 10.0), (40.0, 10.0), (40.0, 40.0), (10.0, 40.0)], 5),
            Region::new("busy", vec![(60.0, 60.0), (90.0, 60.0), (90.0, 90.0), (60.0, 90.0)], 0),
        ];
        let detections = vec![Detection::from_bbox("person", 0.9, (70, 70, 80, 80))];
        let snapshot = analyze(&detections, &regions, 100, 100).unwrap();

        let out = render_overlay(&frame, &regions, &snapshot, &detections);
        assert_eq!(out.dimensions(), frame.dimensions());
        assert_eq!(*out.get_pixel(10, 38), NORMAL_COLOR);
        assert_eq!(*out.get_pixel(75, 60), ANOMALY_COLOR);
        assert_eq!(*out.get_pixel(75, 75), CENTER_COLOR);
        assert_eq!(*out.get_pixel(50, 50), Rgb([0, 0, 0]));
    }

    #[test]
    fn labels_regions_and_total() {
        let frame = RgbImage::new(200, 200);
        let regions = vec![Region::new(
            "hall",
            vec![(20.0, 20.0), (80.0, 20.0), (80.0, 80.0), (20.0, 80.0)],
            5,
        )];
        let snapshot = analyze(&[], &regions, 200, 200).unwrap();

        let out = render_overlay(&frame, &regions, &snapshot, &[]);

        // "hall: 0" anchored at the centroid (100, 100), in the outline color
        let label = count_pixels(&out, 100..155, 100..118, |p| p[1] > 0 && p[0] == 0);
        assert!(label > 0, "region label missing");

        // "Total People: 0" above the region, in red
        let total = count_pixels(&out, 10..190, 10..34, |p| p[0] > 0 && p[1] == 0);
        assert!(total > 0, "total label missing");

        // nothing drawn in the empty lower-left corner
        assert_eq!(count_pixels(&out, 0..35, 170..200, |p| p.0 != [0, 0, 0]), 0);
    }
}
