use serde::Deserialize;
use vmwatch_core::config::Config;
use vmwatch_core::error::{Result, VmwatchError};
use vmwatch_core::model::vm::VmInstance;

use crate::client::ArmClient;

const COMPUTE_API_VERSION: &str = "2025-04-01";

#[derive(Debug, Deserialize)]
pub struct VmListPage {
    #[serde(default)]
    pub value: Vec<VmEntry>,
    #[serde(rename = "nextLink")]
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VmEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: Option<VmEntryProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmEntryProperties {
    pub provisioning_state: Option<String>,
}

/// Follows `value` + `nextLink` pages starting at `first_path` until the
/// provider stops returning a continuation link. Pages are fetched strictly
/// in link order. An upstream that keeps paginating past `max_pages` fails
/// the listing instead of looping.
pub async fn list_all(
    client: &ArmClient,
    first_path: &str,
    max_pages: usize,
) -> Result<Vec<VmEntry>> {
    let mut out = Vec::new();
    let mut next = Some(first_path.to_string());
    let mut pages = 0usize;

    while let Some(path) = next {
        if pages == max_pages {
            return Err(VmwatchError::PaginationLimit { pages });
        }
        let page: VmListPage = client.get(&path).await?;
        out.extend(page.value);
        next = page.next_link;
        pages += 1;
    }

    tracing::debug!(count = out.len(), pages, "listed scale set instances");
    Ok(out)
}

pub fn vm_list_path(cfg: &Config) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachineScaleSets/{}/virtualMachines?api-version={COMPUTE_API_VERSION}",
        cfg.subscription_id, cfg.resource_group, cfg.scale_set
    )
}

pub fn vm_resource_id(cfg: &Config, instance_id: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachineScaleSets/{}/virtualMachines/{instance_id}",
        cfg.subscription_id, cfg.resource_group, cfg.scale_set
    )
}

/// Resource ids look like `.../virtualMachines/{instanceId}`. Anything that
/// does not split cleanly on that separator falls back to the last path
/// segment.
pub fn instance_id_from_resource_id(resource_id: &str) -> Option<String> {
    let parts: Vec<&str> = resource_id.split("/virtualMachines/").collect();
    if parts.len() == 2 {
        return Some(parts[1].to_string());
    }
    resource_id
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Maps raw entries to instances, sorted ascending by numeric instance id.
/// Missing or non-numeric ids sort last.
pub fn into_instances(entries: Vec<VmEntry>) -> Vec<VmInstance> {
    let mut items: Vec<VmInstance> = entries
        .into_iter()
        .map(|entry| {
            let instance_id = instance_id_from_resource_id(&entry.id);
            VmInstance {
                resource_id: entry.id,
                name: entry.name,
                instance_id,
                provisioning_state: entry.properties.and_then(|p| p.provisioning_state),
            }
        })
        .collect();
    items.sort_by_key(|item| numeric_sort_key(item.instance_id.as_deref()));
    items
}

fn numeric_sort_key(instance_id: Option<&str>) -> u64 {
    instance_id
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(u64::MAX)
}
