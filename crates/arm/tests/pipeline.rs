use std::collections::BTreeMap;

use testkit::{FakeArmBuilder, metric_value, sample_base};
use vmwatch_arm::client::ArmClient;
use vmwatch_arm::inventory;
use vmwatch_arm::merge::merge_series;
use vmwatch_arm::metrics::{self, Aggregation, CPU_METRIC, NET_IN_METRIC, NET_OUT_METRIC};
use vmwatch_arm::token::TokenCache;
use vmwatch_core::error::VmwatchError;
use vmwatch_core::time::TimeWindow;

#[tokio::test]
async fn token_is_reused_within_validity_window() {
    let arm = FakeArmBuilder::new().spawn().await;
    let cache = TokenCache::new(&arm.config(), reqwest::Client::new());

    let first = cache.get().await.unwrap();
    let second = cache.get().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(arm.token_requests(), 1);
}

#[tokio::test]
async fn near_expiry_token_triggers_exactly_one_refresh() {
    // 30s of lifetime is inside the 60s refresh skew, so every call refreshes.
    let arm = FakeArmBuilder::new().expires_in(30).spawn().await;
    let cache = TokenCache::new(&arm.config(), reqwest::Client::new());

    let first = cache.get().await.unwrap();
    let second = cache.get().await.unwrap();

    assert_ne!(first, second);
    assert_eq!(arm.token_requests(), 2);
}

#[tokio::test]
async fn failed_token_exchange_is_an_auth_error() {
    let arm = FakeArmBuilder::new().fail_token().spawn().await;
    let cache = TokenCache::new(&arm.config(), reqwest::Client::new());

    let err = cache.get().await.unwrap_err();
    assert!(matches!(err, VmwatchError::Auth(_)), "got {err:?}");
}

#[tokio::test]
async fn non_2xx_becomes_typed_request_error() {
    let arm = FakeArmBuilder::new().spawn().await;
    let client = ArmClient::new(&arm.config()).unwrap();

    let err = client.get::<serde_json::Value>("/no/such/path").await.unwrap_err();
    match err {
        VmwatchError::ArmRequest { status, .. } => assert_eq!(status, 404),
        other => panic!("expected ArmRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn pagination_concatenates_pages_in_order() {
    let arm = FakeArmBuilder::new()
        .pages(&[&["0", "1"], &["2"], &["3"]])
        .spawn()
        .await;
    let cfg = arm.config();
    let client = ArmClient::new(&cfg).unwrap();

    let entries = inventory::list_all(&client, &inventory::vm_list_path(&cfg), cfg.max_pages)
        .await
        .unwrap();

    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["webtier_0", "webtier_1", "webtier_2", "webtier_3"]);
}

#[tokio::test]
async fn pagination_stops_at_page_ceiling() {
    let arm = FakeArmBuilder::new()
        .pages(&[&["0"], &["1"], &["2"]])
        .spawn()
        .await;
    let cfg = arm.config();
    let client = ArmClient::new(&cfg).unwrap();

    let err = inventory::list_all(&client, &inventory::vm_list_path(&cfg), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, VmwatchError::PaginationLimit { pages: 2 }), "got {err:?}");
}

#[tokio::test]
async fn listing_yields_sorted_instances() {
    let arm = FakeArmBuilder::new()
        .pages(&[&["10", "2"], &["1"]])
        .spawn()
        .await;
    let cfg = arm.config();
    let client = ArmClient::new(&cfg).unwrap();

    let entries = inventory::list_all(&client, &inventory::vm_list_path(&cfg), cfg.max_pages)
        .await
        .unwrap();
    let instances = inventory::into_instances(entries);

    let ids: Vec<&str> = instances
        .iter()
        .filter_map(|i| i.instance_id.as_deref())
        .collect();
    assert_eq!(ids, vec!["1", "2", "10"]);
    assert_eq!(instances[0].provisioning_state.as_deref(), Some("Succeeded"));
}

#[tokio::test]
async fn partial_fanout_failure_keeps_batch_usable() {
    let arm = FakeArmBuilder::new()
        .pages(&[&["0", "1", "2"]])
        .failing("1")
        .spawn()
        .await;
    let cfg = arm.config();
    let client = ArmClient::new(&cfg).unwrap();
    let window = TimeWindow::last_minutes(10);
    let ids: Vec<String> = ["0", "1", "2"].iter().map(|s| s.to_string()).collect();

    let batch =
        metrics::fetch_batch(&client, &cfg, &ids, &[CPU_METRIC], &window, Aggregation::Average)
            .await;

    assert_eq!(batch.len(), 3);
    let order: Vec<&str> = batch.iter().map(|b| b.instance_id.as_str()).collect();
    assert_eq!(order, vec!["0", "1", "2"]);

    let failed = &batch[1];
    assert!(failed.error.as_deref().unwrap().contains("500"));
    assert!(failed.series_named(CPU_METRIC).is_empty());

    for ok in [&batch[0], &batch[2]] {
        assert!(ok.error.is_none());
        let points = ok.series_named(CPU_METRIC);
        assert_eq!(points.len(), 3);
        assert_eq!(
            points[0].v,
            Some(metric_value(&ok.instance_id, CPU_METRIC, 0))
        );
    }
}

#[tokio::test]
async fn network_metrics_demux_by_name_despite_reordering() {
    let arm = FakeArmBuilder::new().reorder_metrics().spawn().await;
    let cfg = arm.config();
    let client = ArmClient::new(&cfg).unwrap();
    let window = TimeWindow::last_minutes(10);

    let series = metrics::fetch_instance_series(
        &client,
        &inventory::vm_resource_id(&cfg, "0"),
        &[NET_IN_METRIC, NET_OUT_METRIC],
        &window,
        Aggregation::Total,
    )
    .await
    .unwrap();

    assert_eq!(series[0].name, NET_IN_METRIC);
    assert_eq!(series[1].name, NET_OUT_METRIC);
    assert_eq!(series[0].points[0].v, Some(metric_value("0", NET_IN_METRIC, 0)));
    assert_eq!(series[1].points[0].v, Some(metric_value("0", NET_OUT_METRIC, 0)));
}

#[tokio::test]
async fn fetched_batch_merges_into_aligned_rows() {
    let arm = FakeArmBuilder::new().pages(&[&["0", "1"]]).spawn().await;
    let cfg = arm.config();
    let client = ArmClient::new(&cfg).unwrap();
    let window = TimeWindow::last_minutes(10);
    let ids: Vec<String> = ["0", "1"].iter().map(|s| s.to_string()).collect();

    let batch =
        metrics::fetch_batch(&client, &cfg, &ids, &[CPU_METRIC], &window, Aggregation::Average)
            .await;

    let mut by_id = BTreeMap::new();
    for item in &batch {
        by_id.insert(item.instance_id.clone(), item.series_named(CPU_METRIC));
    }
    let rows = merge_series(&by_id);

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].t, sample_base());
    assert_eq!(rows[0].values["0"], Some(metric_value("0", CPU_METRIC, 0)));
    assert_eq!(rows[0].values["1"], Some(metric_value("1", CPU_METRIC, 0)));
}
