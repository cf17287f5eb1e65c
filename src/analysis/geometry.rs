//! Percentage-space polygons and the point membership test.
//!
//! Regions are configured in percentages of the frame so one definition
//! works for any source resolution. Each call rasterizes them to pixels
//! for the frame at hand.
//!
//! Boundary convention: an edge counts as crossed when the point's y lies
//! in the half-open span `(min_y, max_y]` and the point is at or left of the
//! edge. For an axis-aligned rectangle this puts the max-x and max-y edges
//! inside and the min-x and min-y edges outside.

use super::error::AnalysisError;

/// Frame size used when detections are analyzed without any imagery.
pub const FALLBACK_FRAME_SIZE: (i64, i64) = (1000, 1000);

pub type PixelPoint = (i64, i64);

pub fn percentage_to_pixels(
    polygon_pct: &[(f64, f64)],
    frame_width: i64,
    frame_height: i64,
) -> Result<Vec<PixelPoint>, AnalysisError> {
    if frame_width <= 0 || frame_height <= 0 {
        return Err(AnalysisError::InvalidFrameSize {
            width: frame_width,
            height: frame_height,
        });
    }

    let width = frame_width as f64;
    let height = frame_height as f64;
    Ok(polygon_pct
        .iter()
        .map(|&(x_pct, y_pct)| {
            (
                (x_pct * width / 100.0).round() as i64,
                (y_pct * height / 100.0).round() as i64,
            )
        })
        .collect())
}

/// Ray casting toward +x. O(vertices).
pub fn point_in_polygon(point: PixelPoint, polygon: &[PixelPoint]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let x = point.0 as f64;
    let y = point.1 as f64;
    let mut inside = false;

    let (mut p1x, mut p1y) = (polygon[0].0 as f64, polygon[0].1 as f64);
    for i in 1..=n {
        let (p2x, p2y) = (polygon[i % n].0 as f64, polygon[i % n].1 as f64);

        if y > p1y.min(p2y) && y <= p1y.max(p2y) && x <= p1x.max(p2x) {
            // Horizontal edges never reach here: the y span is empty.
            if p1x == p2x {
                inside = !inside;
            } else {
                let x_intersection = (y - p1y) * (p2x - p1x) / (p2y - p1y) + p1x;
                if x <= x_intersection {
                    inside = !inside;
                }
            }
        }

        p1x = p2x;
        p1y = p2y;
    }

    inside
}
