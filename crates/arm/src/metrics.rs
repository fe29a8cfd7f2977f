use chrono::{DateTime, Utc};
use serde::Deserialize;
use vmwatch_core::config::Config;
use vmwatch_core::error::Result;
use vmwatch_core::model::metric::{MetricSeries, TimePoint};
use vmwatch_core::time::TimeWindow;

use crate::client::ArmClient;
use crate::inventory::vm_resource_id;

const METRICS_API_VERSION: &str = "2018-01-01";

pub const CPU_METRIC: &str = "Percentage CPU";
pub const NET_IN_METRIC: &str = "Network In Total";
pub const NET_OUT_METRIC: &str = "Network Out Total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Average,
    Total,
}

impl Aggregation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Average => "Average",
            Self::Total => "Total",
        }
    }

    fn sample_value(self, sample: &MetricSample) -> Option<f64> {
        match self {
            Self::Average => sample.average,
            Self::Total => sample.total,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MetricsEnvelope {
    #[serde(default)]
    pub value: Vec<MetricEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MetricEntry {
    pub name: MetricName,
    #[serde(default)]
    pub timeseries: Vec<MetricTimeseries>,
}

#[derive(Debug, Deserialize)]
pub struct MetricName {
    pub value: String,
    #[serde(rename = "localizedValue")]
    pub localized_value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MetricTimeseries {
    #[serde(default)]
    pub data: Vec<MetricSample>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub time_stamp: DateTime<Utc>,
    #[serde(default)]
    pub average: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

/// One instance's slice of a batch fetch. A failed instance keeps its slot
/// with empty series and the error message inline, so the rest of the batch
/// stays usable.
#[derive(Debug, Clone)]
pub struct InstanceSeries {
    pub instance_id: String,
    pub resource_id: String,
    pub series: Vec<MetricSeries>,
    pub error: Option<String>,
}

impl InstanceSeries {
    /// Points for one requested metric name; empty when absent.
    pub fn series_named(&self, name: &str) -> Vec<TimePoint> {
        self.series
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.points.clone())
            .unwrap_or_default()
    }
}

/// Fetches the requested metrics for a single resource over `window` at
/// one-minute granularity. Returns one series per requested name, in
/// request order.
pub async fn fetch_instance_series(
    client: &ArmClient,
    resource_id: &str,
    metric_names: &[&str],
    window: &TimeWindow,
    aggregation: Aggregation,
) -> Result<Vec<MetricSeries>> {
    let path = format!("{resource_id}/providers/microsoft.insights/metrics");
    let metricnames = metric_names.join(",");
    let timespan = window.timespan();

    let envelope: MetricsEnvelope = client
        .get_with_query(
            &path,
            &[
                ("api-version", METRICS_API_VERSION),
                ("metricnames", metricnames.as_str()),
                ("timespan", timespan.as_str()),
                ("interval", "PT1M"),
                ("aggregation", aggregation.as_str()),
            ],
        )
        .await?;

    Ok(metric_names
        .iter()
        .map(|name| demux_series(&envelope, name, aggregation))
        .collect())
}

/// Matches a returned metric by name, never by array position; providers
/// may reorder. A requested name absent from the response yields an empty
/// series.
fn demux_series(envelope: &MetricsEnvelope, name: &str, aggregation: Aggregation) -> MetricSeries {
    let points = envelope
        .value
        .iter()
        .find(|entry| entry.name.value == name)
        .and_then(|entry| entry.timeseries.first())
        .map(|ts| {
            ts.data
                .iter()
                .map(|sample| TimePoint {
                    t: sample.time_stamp,
                    v: aggregation.sample_value(sample),
                })
                .collect()
        })
        .unwrap_or_default();

    MetricSeries {
        name: name.to_string(),
        points,
    }
}

/// Fan-out: one concurrent fetch per instance, results in input order.
/// Per-instance failures are caught here and reported inline rather than
/// failing the batch.
pub async fn fetch_batch(
    client: &ArmClient,
    cfg: &Config,
    instance_ids: &[String],
    metric_names: &[&str],
    window: &TimeWindow,
    aggregation: Aggregation,
) -> Vec<InstanceSeries> {
    let tasks = instance_ids.iter().map(|instance_id| {
        let resource_id = vm_resource_id(cfg, instance_id);
        async move {
            match fetch_instance_series(client, &resource_id, metric_names, window, aggregation)
                .await
            {
                Ok(series) => InstanceSeries {
                    instance_id: instance_id.clone(),
                    resource_id,
                    series,
                    error: None,
                },
                Err(err) => {
                    tracing::warn!(instance_id = %instance_id, error = %err, "instance metric fetch failed");
                    InstanceSeries {
                        instance_id: instance_id.clone(),
                        resource_id,
                        series: metric_names
                            .iter()
                            .map(|name| MetricSeries {
                                name: name.to_string(),
                                points: Vec::new(),
                            })
                            .collect(),
                        error: Some(err.to_string()),
                    }
                }
            }
        }
    });

    futures::future::join_all(tasks).await
}
