use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use vmwatch_core::model::metric::{MergedRow, TimePoint};
use vmwatch_core::time::hhmm_label;

/// Merges independently-timestamped series into one wide table keyed by the
/// sorted union of timestamps. Exact-timestamp lookup only, no
/// interpolation; a key with no sample at an instant gets `None`. The first
/// sample wins when a series repeats a timestamp.
pub fn merge_series(series_by_key: &BTreeMap<String, Vec<TimePoint>>) -> Vec<MergedRow> {
    let mut timestamps: BTreeSet<DateTime<Utc>> = BTreeSet::new();
    let mut lookups: BTreeMap<&str, HashMap<DateTime<Utc>, Option<f64>>> = BTreeMap::new();

    for (key, points) in series_by_key {
        let lookup = lookups.entry(key.as_str()).or_default();
        for point in points {
            timestamps.insert(point.t);
            lookup.entry(point.t).or_insert(point.v);
        }
    }

    timestamps
        .into_iter()
        .map(|t| {
            let values = series_by_key
                .keys()
                .map(|key| {
                    let v = lookups
                        .get(key.as_str())
                        .and_then(|lookup| lookup.get(&t).copied())
                        .flatten();
                    (key.clone(), v)
                })
                .collect();
            MergedRow {
                t,
                label: hhmm_label(t),
                values,
            }
        })
        .collect()
}
