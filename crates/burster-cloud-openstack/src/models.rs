//! Keystone, Nova and Neutron payloads

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: Token,
}

#[derive(Debug, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogEndpoint {
    pub interface: String,
    #[serde(default, alias = "region_id")]
    pub region: String,
    pub url: String,
}

/// Any resource looked up by name.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageList {
    pub images: Vec<NamedResource>,
}

#[derive(Debug, Deserialize)]
pub struct FlavorList {
    pub flavors: Vec<NamedResource>,
}

#[derive(Debug, Deserialize)]
pub struct NetworkList {
    pub networks: Vec<NamedResource>,
}

#[derive(Debug, Deserialize)]
pub struct Subnet {
    pub id: String,
    pub cidr: String,
}

#[derive(Debug, Deserialize)]
pub struct SubnetList {
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub device_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PortEnvelope {
    pub port: Port,
}

#[derive(Debug, Deserialize)]
pub struct PortList {
    pub ports: Vec<Port>,
}

#[derive(Debug, Serialize)]
pub struct CreatePortRequest {
    pub port: CreatePort,
}

#[derive(Debug, Serialize)]
pub struct CreatePort {
    pub network_id: String,
    pub admin_state_up: bool,
    pub security_groups: Vec<String>,
    pub port_security_enabled: bool,
    pub fixed_ips: Vec<FixedIp>,
}

#[derive(Debug, Serialize)]
pub struct FixedIp {
    pub ip_address: String,
    pub subnet_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateServerRequest {
    pub server: CreateServer,
}

#[derive(Debug, Serialize)]
pub struct CreateServer {
    pub name: String,
    #[serde(rename = "imageRef")]
    pub image_ref: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    /// Base64-encoded cloud-config.
    pub user_data: String,
    pub config_drive: bool,
    pub networks: Vec<ServerNetwork>,
    pub block_device_mapping_v2: Vec<BlockDeviceMapping>,
}

#[derive(Debug, Serialize)]
pub struct ServerNetwork {
    pub port: String,
}

#[derive(Debug, Serialize)]
pub struct BlockDeviceMapping {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub source_type: String,
    pub destination_type: String,
    pub boot_index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_size: Option<u32>,
    pub delete_on_termination: bool,
}

impl BlockDeviceMapping {
    /// Root disk copied from the image onto local storage.
    pub fn image_root(image_id: &str) -> Self {
        Self {
            uuid: Some(image_id.to_string()),
            source_type: "image".to_string(),
            destination_type: "local".to_string(),
            boot_index: 0,
            volume_size: None,
            delete_on_termination: true,
        }
    }

    /// Empty data volume of `size_gb`.
    pub fn blank_volume(size_gb: u32) -> Self {
        Self {
            uuid: None,
            source_type: "blank".to_string(),
            destination_type: "volume".to_string(),
            boot_index: 1,
            volume_size: Some(size_gb),
            delete_on_termination: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatedServer {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatedServerEnvelope {
    pub server: CreatedServer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fault {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(rename = "OS-EXT-STS:task_state", default)]
    pub task_state: Option<String>,
    #[serde(default)]
    pub fault: Option<Fault>,
}

#[derive(Debug, Deserialize)]
pub struct ServerEnvelope {
    pub server: Server,
}

#[derive(Debug, Deserialize)]
pub struct ServerList {
    pub servers: Vec<Server>,
}

/// Statuses during which Nova is still acting on the server.
const TRANSITIONAL_STATUSES: &[&str] = &[
    "BUILD",
    "REBUILD",
    "REBOOT",
    "HARD_REBOOT",
    "MIGRATING",
    "RESIZE",
    "REVERT_RESIZE",
    "PASSWORD",
];

impl Server {
    pub fn is_active(&self) -> bool {
        self.status == "ACTIVE"
    }

    pub fn is_error(&self) -> bool {
        self.status == "ERROR"
    }

    pub fn is_gone(&self) -> bool {
        matches!(self.status.as_str(), "DELETED" | "SOFT_DELETED")
    }

    /// No status transition or task in progress.
    pub fn is_settled(&self) -> bool {
        self.task_state.is_none() && !TRANSITIONAL_STATUSES.contains(&self.status.as_str())
    }

    pub fn fault_message(&self) -> String {
        self.fault
            .as_ref()
            .map(|f| f.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "no fault reported".to_string())
    }
}
