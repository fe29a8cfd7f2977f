mod output;
mod telemetry;

use std::collections::BTreeMap;

use anyhow::Context;
use clap::{Parser, Subcommand};
use vmwatch_arm::metrics::{Aggregation, CPU_METRIC, NET_IN_METRIC, NET_OUT_METRIC};
use vmwatch_arm::{ArmClient, inventory, merge, metrics};
use vmwatch_core::VmwatchError;
use vmwatch_core::config::Config;
use vmwatch_core::query::{
    CpuMetricsResponse, CpuSeriesItem, NetworkMetricsResponse, NetworkSeriesItem, VmListResponse,
};
use vmwatch_core::time::TimeWindow;

use crate::output::{print_merged_table, print_vm_list_human};
use crate::telemetry::{init_cli_tracing, init_run_tracing};

#[derive(Parser, Debug)]
#[command(name = "vmwatch")]
#[command(about = "Read-only VM scale-set monitoring proxy and CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Serve the monitoring HTTP API")]
    Run {
        #[arg(long)]
        http_addr: Option<String>,
    },
    #[command(about = "List scale-set instances")]
    Vm,
    #[command(about = "Fetch per-instance CPU usage for a recent window")]
    Cpu {
        #[arg(long, help = "Comma-separated instance ids (e.g. 9,10)")]
        instance_ids: String,
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=180))]
        minutes: u32,
    },
    #[command(about = "Fetch per-instance network in/out totals for a recent window")]
    Net {
        #[arg(long, help = "Comma-separated instance ids (e.g. 9,10)")]
        instance_ids: String,
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=180))]
        minutes: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { http_addr } => {
            init_run_tracing();
            let mut cfg = Config::load().context("load config")?;
            if let Some(v) = http_addr {
                cfg.http_addr = v;
            }
            let addr = cfg.http_addr.parse().context("parse http addr")?;

            eprintln!("vmwatch run");
            eprintln!("  scale set: {}/{}", cfg.resource_group, cfg.scale_set);
            eprintln!("  arm: {}", cfg.arm_endpoint);
            eprintln!("  http: {}", cfg.http_addr);

            vmwatch_api::run_api_server(cfg, addr).await?;
            Ok(())
        }
        Commands::Vm => {
            init_cli_tracing();
            let cfg = Config::load().context("load config")?;
            run_vm(cfg, cli.json).await
        }
        Commands::Cpu {
            instance_ids,
            minutes,
        } => {
            init_cli_tracing();
            let cfg = Config::load().context("load config")?;
            run_cpu(cfg, &instance_ids, minutes, cli.json).await
        }
        Commands::Net {
            instance_ids,
            minutes,
        } => {
            init_cli_tracing();
            let cfg = Config::load().context("load config")?;
            run_net(cfg, &instance_ids, minutes, cli.json).await
        }
    }
}

async fn run_vm(cfg: Config, json: bool) -> anyhow::Result<()> {
    let client = ArmClient::new(&cfg)?;
    let entries =
        inventory::list_all(&client, &inventory::vm_list_path(&cfg), cfg.max_pages).await?;
    let items = inventory::into_instances(entries);
    let response = VmListResponse {
        is_success: true,
        count: items.len(),
        items,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_vm_list_human(&response);
    }
    Ok(())
}

async fn run_cpu(cfg: Config, instance_ids: &str, minutes: u32, json: bool) -> anyhow::Result<()> {
    let ids = split_ids(instance_ids)?;
    let client = ArmClient::new(&cfg)?;
    let window = TimeWindow::last_minutes(minutes);

    let batch = metrics::fetch_batch(
        &client,
        &cfg,
        &ids,
        &[CPU_METRIC],
        &window,
        Aggregation::Average,
    )
    .await;

    if json {
        let items = batch
            .into_iter()
            .map(|item| CpuSeriesItem {
                points: item.series_named(CPU_METRIC),
                instance_id: item.instance_id,
                resource_id: item.resource_id,
                error: item.error,
            })
            .collect();
        let response = CpuMetricsResponse {
            is_success: true,
            minutes,
            items,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let mut by_id = BTreeMap::new();
    for item in &batch {
        if let Some(err) = &item.error {
            eprintln!("instance {}: {err}", item.instance_id);
        }
        by_id.insert(item.instance_id.clone(), item.series_named(CPU_METRIC));
    }
    let keys: Vec<String> = by_id.keys().cloned().collect();
    print_merged_table("CPU % (average per minute)", &keys, &merge::merge_series(&by_id));
    Ok(())
}

async fn run_net(cfg: Config, instance_ids: &str, minutes: u32, json: bool) -> anyhow::Result<()> {
    let ids = split_ids(instance_ids)?;
    let client = ArmClient::new(&cfg)?;
    let window = TimeWindow::last_minutes(minutes);

    let batch = metrics::fetch_batch(
        &client,
        &cfg,
        &ids,
        &[NET_IN_METRIC, NET_OUT_METRIC],
        &window,
        Aggregation::Total,
    )
    .await;

    if json {
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
        let response = NetworkMetricsResponse {
            is_success: true,
            minutes,
            items,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    for item in &batch {
        if let Some(err) = &item.error {
            eprintln!("instance {}: {err}", item.instance_id);
        }
    }

    for (title, name) in [
        ("Network In (bytes per minute)", NET_IN_METRIC),
        ("Network Out (bytes per minute)", NET_OUT_METRIC),
    ] {
        let mut by_id = BTreeMap::new();
        for item in &batch {
            by_id.insert(item.instance_id.clone(), item.series_named(name));
        }
        let keys: Vec<String> = by_id.keys().cloned().collect();
        print_merged_table(title, &keys, &merge::merge_series(&by_id));
    }
    Ok(())
}

fn split_ids(raw: &str) -> anyhow::Result<Vec<String>> {
    let ids: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        return Err(VmwatchError::InvalidArgument(
            "at least one instance id is required".to_string(),
        )
        .into());
    }
    Ok(ids)
}
