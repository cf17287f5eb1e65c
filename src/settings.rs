use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use crate::analysis::{region::validate_regions, Region};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSettings {
    /// Polygon vertices as [x%, y%] pairs.
    pub coordinates: Vec<(f64, f64)>,
    pub max_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMethod {
    Console,
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    pub enabled: bool,
    /// Seconds between two alerts for the same region key.
    pub cooldown: f64,
    pub methods: Vec<AlertMethod>,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown: 60.0,
            methods: vec![AlertMethod::Log],
        }
    }
}

impl AlertSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::milliseconds((self.cooldown * 1000.0).round() as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/crowdwatch.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Analyze every Nth raw frame of a stream.
    pub analyze_every: u64,
    /// Persist every Mth analyzed frame.
    pub persist_every: u64,
    /// Where annotated stills are written, if anywhere.
    pub output_dir: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            analyze_every: 5,
            persist_every: 30,
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub regions: BTreeMap<String, RegionSettings>,
    pub alert: AlertSettings,
    pub database: DatabaseSettings,
    pub pipeline: PipelineSettings,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn region_list(&self) -> Vec<Region> {
        self.regions
            .iter()
            .map(|(name, region)| {
                Region::new(name.clone(), region.coordinates.clone(), region.max_count)
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        validate_regions(&self.region_list()).context("invalid region configuration")?;

        if !self.alert.cooldown.is_finite() || self.alert.cooldown < 0.0 {
            bail!(
                "alert cooldown must be a non-negative number of seconds, got {}",
                self.alert.cooldown
            );
        }
        if self.pipeline.analyze_every == 0 {
            bail!("pipeline.analyze_every must be at least 1");
        }
        if self.pipeline.persist_every == 0 {
            bail!("pipeline.persist_every must be at least 1");
        }
        Ok(())
    }
}

/// Regions saved separately from the main settings, e.g. after editing
/// them interactively. Returns `None` when no file exists.
pub fn load_regions(path: &Path) -> Result<Option<BTreeMap<String, RegionSettings>>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read regions from {}", path.display()))?;
    let regions = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse regions in {}", path.display()))?;
    Ok(Some(regions))
}

pub fn save_regions(path: &Path, regions: &BTreeMap<String, RegionSettings>) -> Result<()> {
    write_json(path, regions)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized).with_context(|| format!("Failed to write {}", path.display()))
}

/// Settings shared by the sessions of one process. Region edits are
/// written through to disk.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            Settings::load(&path)?
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Applies a regions file on top of the loaded settings, if one exists.
    pub fn apply_regions_file(&self, regions_path: &Path) -> Result<bool> {
        let Some(regions) = load_regions(regions_path)? else {
            return Ok(false);
        };
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
        let mut candidate = guard.clone();
        candidate.regions = regions;
        candidate.validate()?;
        *guard = candidate;
        Ok(true)
    }

    pub fn settings(&self) -> Settings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update_regions(&self, regions: BTreeMap<String, RegionSettings>) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
        let mut candidate = guard.clone();
        candidate.regions = regions;
        candidate.validate()?;
        candidate.save(&self.path)?;
        *guard = candidate;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "regions": {
            "entrance": { "coordinates": [[0, 0], [50, 0], [50, 50], [0, 50]], "max_count": 3 },
            "hall": { "coordinates": [[50, 50], [100, 50], [100, 100]], "max_count": 10 }
        },
        "alert": { "enabled": true, "cooldown": 10, "methods": ["console", "log"] }
    }"#;

    #[test]
    fn parses_partial_settings_with_defaults() {
        let settings: Settings = serde_json::from_str(SAMPLE).unwrap();
        settings.validate().unwrap();

        assert_eq!(settings.regions.len(), 2);
        assert_eq!(settings.alert.cooldown(), Duration::seconds(10));
        assert_eq!(settings.alert.methods, vec![AlertMethod::Console, AlertMethod::Log]);
        assert_eq!(settings.pipeline.analyze_every, 5);
        assert_eq!(settings.pipeline.persist_every, 30);

        let regions = settings.region_list();
        assert_eq!(regions[0].name, "entrance");
        assert_eq!(regions[0].polygon[1], (50.0, 0.0));
    }

    #[test]
    fn rejects_bad_region_and_zero_stride() {
        let mut settings: Settings = serde_json::from_str(SAMPLE).unwrap();
        settings.pipeline.analyze_every = 0;
        assert!(settings.validate().is_err());

        let mut settings: Settings = serde_json::from_str(SAMPLE).unwrap();
        settings
            .regions
            .get_mut("hall")
            .unwrap()
            .coordinates
            .truncate(2);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn regions_file_round_trips_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.json");
        let regions_path = dir.path().join("config").join("regions.json");

        let store = SettingsStore::new(settings_path.clone()).unwrap();
        assert!(!store.apply_regions_file(&regions_path).unwrap());

        let parsed: Settings = serde_json::from_str(SAMPLE).unwrap();
        save_regions(&regions_path, &parsed.regions).unwrap();
        assert!(store.apply_regions_file(&regions_path).unwrap());
        assert_eq!(store.settings().regions, parsed.regions);

        store.update_regions(BTreeMap::new()).unwrap();
        let reloaded = Settings::load(&settings_path).unwrap();
        assert!(reloaded.regions.is_empty());
    }
}
