use serde::{Deserialize, Serialize};

/// Private network hosts attach to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "subnetCIDR", default)]
    pub subnet_cidr: String,

    #[serde(default)]
    pub dns: String,

    /// DNS search domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    #[serde(default)]
    pub gateway: String,
}
