use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::sinks::{sinks_for, AlertSink};
use crate::analysis::{AnalysisSnapshot, Region};
use crate::settings::AlertSettings;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_warn};

/// People anywhere in the frame above this count raise the crowd alert.
pub const GLOBAL_CROWD_THRESHOLD: u32 = 50;

/// Cooldown key for the crowd alert, alongside the region names.
pub const TOTAL_KEY: &str = "total";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: DateTime<Utc>,
    /// `"total"` or a region name.
    pub region: String,
    pub count: u32,
    pub max_count: u32,
    pub message: String,
}

/// Strictly greater: exactly at the cooldown boundary nothing fires.
fn cooldown_elapsed(last: DateTime<Utc>, now: DateTime<Utc>, cooldown: Duration) -> bool {
    now.signed_duration_since(last) > cooldown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKeyState {
    Quiet,
    RecentlyAlerted,
}

/// Per-session alert decisions under a cooldown.
///
/// Holds the only mutable state of the analysis core: the last time each
/// key fired. Keys are seeded at the Unix epoch so the first anomaly
/// always fires.
pub struct AlertManager {
    enabled: bool,
    cooldown: Duration,
    max_counts: BTreeMap<String, u32>,
    last_alert_time: HashMap<String, DateTime<Utc>>,
    sinks: Vec<Box<dyn AlertSink>>,
}

impl AlertManager {
    pub fn new(settings: &AlertSettings, regions: &[Region]) -> Self {
        Self::with_sinks(settings, regions, sinks_for(&settings.methods))
    }

    pub fn with_sinks(
        settings: &AlertSettings,
        regions: &[Region],
        sinks: Vec<Box<dyn AlertSink>>,
    ) -> Self {
        let max_counts: BTreeMap<String, u32> = regions
            .iter()
            .map(|r| (r.name.clone(), r.max_count))
            .collect();

        let mut last_alert_time: HashMap<String, DateTime<Utc>> = max_counts
            .keys()
            .map(|name| (name.clone(), DateTime::<Utc>::UNIX_EPOCH))
            .collect();
        last_alert_time.insert(TOTAL_KEY.to_string(), DateTime::<Utc>::UNIX_EPOCH);

        Self {
            enabled: settings.enabled,
            cooldown: settings.cooldown(),
            max_counts,
            last_alert_time,
            sinks,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn last_alert_time(&self, key: &str) -> Option<DateTime<Utc>> {
        self.last_alert_time.get(key).copied()
    }

    /// Derived from elapsed time on every call; there is no timer.
    pub fn key_state(&self, key: &str, now: DateTime<Utc>) -> Option<AlertKeyState> {
        let last = self.last_alert_time.get(key)?;
        Some(if cooldown_elapsed(*last, now, self.cooldown) {
            AlertKeyState::Quiet
        } else {
            AlertKeyState::RecentlyAlerted
        })
    }

    /// Decides which keys fire this cycle and delivers them.
    ///
    /// A fired key's cooldown clock advances before delivery, so a failing
    /// sink cannot cause a repeat on the next frame.
    pub fn check_and_alert(
        &mut self,
        snapshot: &AnalysisSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<AlertRecord> {
        if !self.enabled {
            return Vec::new();
        }

        let mut fired = Vec::new();

        if snapshot.total_people > GLOBAL_CROWD_THRESHOLD && self.try_fire(TOTAL_KEY, now) {
            fired.push(AlertRecord {
                timestamp: now,
                region: TOTAL_KEY.to_string(),
                count: snapshot.total_people,
                max_count: GLOBAL_CROWD_THRESHOLD,
                message: format!(
                    "ALERT: Large crowd detected. Total count: {}",
                    snapshot.total_people
                ),
            });
        }

        for region in snapshot.anomalous_regions() {
            let Some(&max_count) = self.max_counts.get(region) else {
                log_warn!("anomaly reported for unknown region '{}', skipping", region);
                continue;
            };
            if !self.try_fire(region, now) {
                continue;
            }

            let count = snapshot.counts.get(region).copied().unwrap_or_default();
            fired.push(AlertRecord {
                timestamp: now,
                region: region.to_string(),
                count,
                max_count,
                message: format!(
                    "ALERT: Abnormal gathering detected in {region}. \
                     Current count: {count}, Maximum normal: {max_count}"
                ),
            });
        }

        for alert in &fired {
            self.deliver(alert);
        }

        fired
    }

    fn try_fire(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        let cooldown = self.cooldown;
        let Some(last) = self.last_alert_time.get_mut(key) else {
            return false;
        };
        if cooldown_elapsed(*last, now, cooldown) {
            *last = now;
            true
        } else {
            false
        }
    }

    fn deliver(&self, alert: &AlertRecord) {
        for sink in &self.sinks {
            if let Err(err) = sink.deliver(alert) {
                log_error!(
                    "alert delivery via {} failed for '{}': {err:?}",
                    sink.name(),
                    alert.region
                );
            }
        }
    }
}
