use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAlert {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub region: String,
    pub count: u32,
    pub max_count: u32,
    pub message: String,
    pub source_label: String,
}
