use serde::{Deserialize, Serialize};

use crate::model::metric::TimePoint;
use crate::model::vm::VmInstance;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmListResponse {
    pub is_success: bool,
    pub count: usize,
    pub items: Vec<VmInstance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuSeriesItem {
    pub instance_id: String,
    pub resource_id: String,
    pub points: Vec<TimePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuMetricsResponse {
    pub is_success: bool,
    pub minutes: u32,
    pub items: Vec<CpuSeriesItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSeriesItem {
    pub instance_id: String,
    pub resource_id: String,
    pub net_in: Vec<TimePoint>,
    pub net_out: Vec<TimePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMetricsResponse {
    pub is_success: bool,
    pub minutes: u32,
    pub items: Vec<NetworkSeriesItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub is_success: bool,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            message: message.into(),
        }
    }
}
