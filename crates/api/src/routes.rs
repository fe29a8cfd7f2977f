use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;
use vmwatch_arm::ArmClient;
use vmwatch_arm::metrics::{Aggregation, CPU_METRIC, NET_IN_METRIC, NET_OUT_METRIC};
use vmwatch_arm::{inventory, metrics};
use vmwatch_core::VmwatchError;
use vmwatch_core::config::Config;
use vmwatch_core::query::{
    CpuMetricsResponse, CpuSeriesItem, ErrorResponse, NetworkMetricsResponse, NetworkSeriesItem,
    VmListResponse,
};
use vmwatch_core::time::TimeWindow;

#[derive(Clone)]
pub struct ApiState {
    pub arm: Arc<ArmClient>,
    pub cfg: Arc<Config>,
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);
    Router::new()
        .route("/health", get(health))
        .route("/vm", get(list_vms))
        .route("/metrics/cpu", get(cpu_metrics))
        .route("/metrics/network", get(network_metrics))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .on_request(tower_http::trace::DefaultOnRequest::new().level(Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Whole-response failures mapped to HTTP statuses; per-instance metric
/// failures never reach this path (they ride inline in the items).
struct ApiError(VmwatchError);

impl From<VmwatchError> for ApiError {
    fn from(err: VmwatchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            VmwatchError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            VmwatchError::Auth(_)
            | VmwatchError::Transport(_)
            | VmwatchError::ArmRequest { .. }
            | VmwatchError::Schema(_)
            | VmwatchError::PaginationLimit { .. } => StatusCode::BAD_GATEWAY,
            VmwatchError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "request failed");
        }
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn list_vms(State(state): State<ApiState>) -> Result<Json<VmListResponse>, ApiError> {
    let entries = inventory::list_all(
        &state.arm,
        &inventory::vm_list_path(&state.cfg),
        state.cfg.max_pages,
    )
    .await?;
    let items = inventory::into_instances(entries);

    Ok(Json(VmListResponse {
        is_success: true,
        count: items.len(),
        items,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MetricsParams {
    #[serde(rename = "instanceIds")]
    instance_ids: Option<String>,
    minutes: Option<u32>,
}

/// Validated before anything touches the upstream.
fn parse_params(params: &MetricsParams) -> Result<(Vec<String>, u32), VmwatchError> {
    let ids: Vec<String> = params
        .instance_ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        return Err(VmwatchError::InvalidArgument(
            "instanceIds query param required (e.g. ?instanceIds=9,10)".to_string(),
        ));
    }

    let minutes = params.minutes.unwrap_or(10);
    if !(1..=180).contains(&minutes) {
        return Err(VmwatchError::InvalidArgument(
            "minutes must be between 1 and 180".to_string(),
        ));
    }

    Ok((ids, minutes))
}

async fn cpu_metrics(
    State(state): State<ApiState>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<CpuMetricsResponse>, ApiError> {
    let (ids, minutes) = parse_params(&params)?;
    let window = TimeWindow::last_minutes(minutes);

    let batch = metrics::fetch_batch(
        &state.arm,
        &state.cfg,
        &ids,
        &[CPU_METRIC],
        &window,
        Aggregation::Average,
    )
    .await;

    let items = batch
        .into_iter()
        .map(|item| CpuSeriesItem {
            points: item.series_named(CPU_METRIC),
            instance_id: item.instance_id,
            resource_id: item.resource_id,
            error: item.error,
        })
        .collect();

    Ok(Json(CpuMetricsResponse {
        is_success: true,
        minutes,
        items,
    }))
}

async fn network_metrics(
    State(state): State<ApiState>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<NetworkMetricsResponse>, ApiError> {
    let (ids, minutes) = parse_params(&params)?;
    let window = TimeWindow::last_minutes(minutes);

    let batch = metrics::fetch_batch(
        &state.arm,
        &state.cfg,
        &ids,
        &[NET_IN_METRIC, NET_OUT_METRIC],
        &window,
        Aggregation::Total,
    )
    .await;

    let items = batch
        .into_iter()
        .map(|item| NetworkSeriesItem {
            net_in: item.series_named(NET_IN_METRIC),
            net_out: item.series_named(NET_OUT_METRIC),
            instance_id: item.instance_id,
            resource_id: item.resource_id,
            error: item.error,
        })
        .collect();

    Ok(Json(NetworkMetricsResponse {
        is_success: true,
        minutes,
        items,
    }))
}
