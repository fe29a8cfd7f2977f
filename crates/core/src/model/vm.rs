use serde::{Deserialize, Serialize};

/// One scale-set member, derived from an inventory listing entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VmInstance {
    #[serde(rename = "id")]
    pub resource_id: String,
    pub name: String,
    #[serde(rename = "instanceId")]
    pub instance_id: Option<String>,
    #[serde(rename = "provisioningState")]
    pub provisioning_state: Option<String>,
}
