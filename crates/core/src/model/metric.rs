use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single sample. `v = None` means the provider had no value at this instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimePoint {
    pub t: DateTime<Utc>,
    pub v: Option<f64>,
}

/// One instance/metric series in provider order (not guaranteed sorted).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSeries {
    pub name: String,
    pub points: Vec<TimePoint>,
}

/// One chart row: a timestamp, its local-time label, and one value per series key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergedRow {
    pub t: DateTime<Utc>,
    pub label: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}
