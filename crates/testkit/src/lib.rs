use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use vmwatch_core::config::Config;

/// In-process fake ARM upstream: a token endpoint with a request counter,
/// a paged scale-set inventory, and per-instance metric responses with
/// injectable failures and name reordering.
pub struct FakeArm {
    pub addr: SocketAddr,
    state: Arc<FakeArmState>,
    server: tokio::task::JoinHandle<()>,
}

impl FakeArm {
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// How many token exchanges the upstream has served so far.
    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }

    /// A config pointing every endpoint at this fake.
    pub fn config(&self) -> Config {
        Config {
            tenant_id: "tenant".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            subscription_id: "sub".into(),
            resource_group: "rg".into(),
            scale_set: "webtier".into(),
            arm_endpoint: self.endpoint(),
            login_endpoint: self.endpoint(),
            ..Config::default()
        }
    }
}

impl Drop for FakeArm {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// The value the fake serves for one instance/metric/minute. Tests compare
/// against this instead of hard-coding the arithmetic.
pub fn metric_value(instance_id: &str, metric_name: &str, minute: i64) -> f64 {
    let seed: f64 = instance_id.parse().unwrap_or(0.0);
    seed * 10.0 + minute as f64 + metric_name.len() as f64 * 100.0
}

/// First sample instant served by the fake; later samples step by one minute.
pub fn sample_base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()
}

pub struct FakeArmBuilder {
    expires_in: i64,
    fail_token: bool,
    pages: Vec<Vec<String>>,
    failing: Vec<String>,
    reorder_metrics: bool,
}

impl Default for FakeArmBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeArmBuilder {
    pub fn new() -> Self {
        Self {
            expires_in: 3600,
            fail_token: false,
            pages: vec![vec!["0".to_string(), "1".to_string()]],
            failing: Vec::new(),
            reorder_metrics: false,
        }
    }

    /// The token endpoint answers 500 instead of issuing tokens.
    pub fn fail_token(mut self) -> Self {
        self.fail_token = true;
        self
    }

    /// Lifetime reported by the token endpoint, in seconds.
    pub fn expires_in(mut self, secs: i64) -> Self {
        self.expires_in = secs;
        self
    }

    /// Instance ids per inventory page; pages chain via nextLink.
    pub fn pages(mut self, pages: &[&[&str]]) -> Self {
        self.pages = pages
            .iter()
            .map(|page| page.iter().map(|id| id.to_string()).collect())
            .collect();
        self
    }

    /// Metric requests for this instance id answer 500.
    pub fn failing(mut self, instance_id: &str) -> Self {
        self.failing.push(instance_id.to_string());
        self
    }

    /// Return metric entries in reverse of the requested order.
    pub fn reorder_metrics(mut self) -> Self {
        self.reorder_metrics = true;
        self
    }

    pub async fn spawn(self) -> FakeArm {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake arm listener");
        let addr = listener.local_addr().expect("local addr");

        let state = Arc::new(FakeArmState {
            addr,
            token_requests: AtomicUsize::new(0),
            expires_in: self.expires_in,
            fail_token: self.fail_token,
            pages: self.pages,
            failing: self.failing,
            reorder_metrics: self.reorder_metrics,
        });

        let router = Router::new()
            .route(
                "/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Compute/virtualMachineScaleSets/{ss}/virtualMachines",
                get(list_vms),
            )
            .route(
                "/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Compute/virtualMachineScaleSets/{ss}/virtualMachines/{id}/providers/microsoft.insights/metrics",
                get(instance_metrics),
            )
            .route("/{tenant}/oauth2/v2.0/token", post(issue_token))
            .with_state(state.clone());

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        FakeArm {
            addr,
            state,
            server,
        }
    }
}

struct FakeArmState {
    addr: SocketAddr,
    token_requests: AtomicUsize,
    expires_in: i64,
    fail_token: bool,
    pages: Vec<Vec<String>>,
    failing: Vec<String>,
    reorder_metrics: bool,
}

async fn issue_token(State(state): State<Arc<FakeArmState>>) -> Response {
    let n = state.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
    if state.fail_token {
        return (StatusCode::INTERNAL_SERVER_ERROR, "simulated auth failure").into_response();
    }
    Json(json!({
        "token_type": "Bearer",
        "expires_in": state.expires_in,
        "access_token": format!("token-{n}"),
    }))
    .into_response()
}

async fn list_vms(
    State(state): State<Arc<FakeArmState>>,
    Path((sub, rg, ss)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let page: usize = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);

    let ids = state.pages.get(page).cloned().unwrap_or_default();
    let value: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": format!(
                    "/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Compute/virtualMachineScaleSets/{ss}/virtualMachines/{id}"
                ),
                "name": format!("{ss}_{id}"),
                "properties": { "provisioningState": "Succeeded" },
            })
        })
        .collect();

    let mut body = json!({ "value": value });
    if page + 1 < state.pages.len() {
        body["nextLink"] = json!(format!(
            "http://{}/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Compute/virtualMachineScaleSets/{ss}/virtualMachines?api-version=2025-04-01&page={}",
            state.addr,
            page + 1
        ));
    }
    Json(body)
}

async fn instance_metrics(
    State(state): State<Arc<FakeArmState>>,
    Path((_sub, _rg, _ss, id)): Path<(String, String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if state.failing.contains(&id) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "simulated instance failure",
        )
            .into_response();
    }

    let (Some(metricnames), Some(aggregation)) =
        (params.get("metricnames"), params.get("aggregation"))
    else {
        return (StatusCode::BAD_REQUEST, "metricnames and aggregation required").into_response();
    };
    if !params.contains_key("timespan") || !params.contains_key("interval") {
        return (StatusCode::BAD_REQUEST, "timespan and interval required").into_response();
    }

    let mut names: Vec<&str> = metricnames.split(',').collect();
    if state.reorder_metrics {
        names.reverse();
    }

    let value: Vec<serde_json::Value> = names
        .iter()
        .map(|name| {
            let data: Vec<serde_json::Value> = (0..3)
                .map(|i| {
                    let ts = (sample_base() + Duration::minutes(i)).to_rfc3339();
                    let v = metric_value(&id, name, i);
                    match aggregation.as_str() {
                        "Average" => json!({ "timeStamp": ts, "average": v }),
                        _ => json!({ "timeStamp": ts, "total": v }),
                    }
                })
                .collect();
            json!({
                "name": { "value": name, "localizedValue": name },
                "timeseries": [ { "data": data } ],
            })
        })
        .collect();

    Json(json!({ "value": value })).into_response()
}
