use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::AnalysisError;

/// Named polygonal zone with a capacity threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    /// Vertices as (x%, y%) of the frame.
    pub polygon: Vec<(f64, f64)>,
    pub max_count: u32,
}

impl Region {
    pub fn new(name: impl Into<String>, polygon: Vec<(f64, f64)>, max_count: u32) -> Self {
        Self {
            name: name.into(),
            polygon,
            max_count,
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.polygon.len() < 3 {
            return Err(AnalysisError::TooFewVertices {
                region: self.name.clone(),
                vertices: self.polygon.len(),
            });
        }

        for (index, &(x, y)) in self.polygon.iter().enumerate() {
            let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
            if !in_range(x) || !in_range(y) {
                return Err(AnalysisError::CoordinateOutOfRange {
                    region: self.name.clone(),
                    index,
                    x,
                    y,
                });
            }
        }

        Ok(())
    }
}

/// Validates each region and name uniqueness across the set.
pub fn validate_regions(regions: &[Region]) -> Result<(), AnalysisError> {
    let mut seen = HashSet::with_capacity(regions.len());
    for region in regions {
        region.validate()?;
        if !seen.insert(region.name.as_str()) {
            return Err(AnalysisError::DuplicateRegion(region.name.clone()));
        }
    }
    Ok(())
}
