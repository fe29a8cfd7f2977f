use std::net::SocketAddr;
use std::sync::Arc;

use testkit::{FakeArm, FakeArmBuilder, metric_value};
use vmwatch_api::routes::{ApiState, router};
use vmwatch_arm::ArmClient;
use vmwatch_arm::metrics::{CPU_METRIC, NET_IN_METRIC, NET_OUT_METRIC};

async fn serve_api(arm: &FakeArm) -> SocketAddr {
    let cfg = arm.config();
    let client = Arc::new(ArmClient::new(&cfg).unwrap());
    let state = ApiState {
        arm: client,
        cfg: Arc::new(cfg),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router(state)).await;
    });
    addr
}

async fn get_json(url: &str) -> (reqwest::StatusCode, serde_json::Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status();
    let body = resp.json().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn health_answers_ok() {
    let arm = FakeArmBuilder::new().spawn().await;
    let addr = serve_api(&arm).await;

    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn vm_endpoint_lists_sorted_instances() {
    let arm = FakeArmBuilder::new()
        .pages(&[&["10", "2"], &["1"]])
        .spawn()
        .await;
    let addr = serve_api(&arm).await;

    let (status, body) = get_json(&format!("http://{addr}/vm")).await;

    assert!(status.is_success());
    assert_eq!(body["isSuccess"], serde_json::json!(true));
    assert_eq!(body["count"], serde_json::json!(3));
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["instanceId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "2", "10"]);
    let first = &body["items"][0];
    assert!(first["id"].as_str().unwrap().contains("/virtualMachines/1"));
    assert_eq!(first["provisioningState"], serde_json::json!("Succeeded"));
}

#[tokio::test]
async fn cpu_missing_instance_ids_is_400_and_never_reaches_upstream() {
    let arm = FakeArmBuilder::new().spawn().await;
    let addr = serve_api(&arm).await;

    let (status, body) = get_json(&format!("http://{addr}/metrics/cpu")).await;

    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(body["isSuccess"], serde_json::json!(false));
    assert!(body["message"].as_str().unwrap().contains("instanceIds"));
    assert_eq!(arm.token_requests(), 0);
}

#[tokio::test]
async fn cpu_minutes_out_of_range_is_400() {
    let arm = FakeArmBuilder::new().spawn().await;
    let addr = serve_api(&arm).await;

    let (status, _) =
        get_json(&format!("http://{addr}/metrics/cpu?instanceIds=1&minutes=181")).await;
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cpu_endpoint_reports_partial_failures_inline() {
    let arm = FakeArmBuilder::new()
        .pages(&[&["0", "1", "2"]])
        .failing("1")
        .spawn()
        .await;
    let addr = serve_api(&arm).await;

    let (status, body) =
        get_json(&format!("http://{addr}/metrics/cpu?instanceIds=0,1,2&minutes=5")).await;

    assert!(status.is_success());
    assert_eq!(body["minutes"], serde_json::json!(5));
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);

    assert_eq!(items[1]["instanceId"], serde_json::json!("1"));
    assert!(items[1]["points"].as_array().unwrap().is_empty());
    assert!(!items[1]["error"].as_str().unwrap().is_empty());

    for ok in [&items[0], &items[2]] {
        assert!(ok.get("error").is_none());
        let points = ok["points"].as_array().unwrap();
        assert_eq!(points.len(), 3);
        let expected = metric_value(ok["instanceId"].as_str().unwrap(), CPU_METRIC, 0);
        assert_eq!(points[0]["v"], serde_json::json!(expected));
    }
}

#[tokio::test]
async fn network_endpoint_splits_in_and_out_by_name() {
    let arm = FakeArmBuilder::new().reorder_metrics().spawn().await;
    let addr = serve_api(&arm).await;

    let (status, body) =
        get_json(&format!("http://{addr}/metrics/network?instanceIds=0")).await;

    assert!(status.is_success());
    let item = &body["items"][0];
    let net_in = item["netIn"].as_array().unwrap();
    let net_out = item["netOut"].as_array().unwrap();
    assert_eq!(
        net_in[0]["v"],
        serde_json::json!(metric_value("0", NET_IN_METRIC, 0))
    );
    assert_eq!(
        net_out[0]["v"],
        serde_json::json!(metric_value("0", NET_OUT_METRIC, 0))
    );
}

#[tokio::test]
async fn upstream_auth_failure_maps_to_502() {
    let arm = FakeArmBuilder::new().fail_token().spawn().await;
    let addr = serve_api(&arm).await;

    let (status, body) = get_json(&format!("http://{addr}/vm")).await;

    assert_eq!(status, reqwest::StatusCode::BAD_GATEWAY);
    assert_eq!(body["isSuccess"], serde_json::json!(false));
    assert!(body["message"].as_str().unwrap().contains("token exchange"));
}
