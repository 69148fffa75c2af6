//! Shadow API request and response types

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

const HOSTNAME_MARKER: &str = "# cloud-burster hostname: ";

/// Launch script line identifying the VM that holds `hostname`.
pub fn hostname_marker(hostname: &str) -> String {
    format!("{HOSTNAME_MARKER}{hostname}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UuidRef {
    pub uuid: String,
}

impl UuidRef {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self { uuid: uuid.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct BlockDeviceRequest {
    pub dry_run: bool,
    pub block_device: NewBlockDevice,
}

#[derive(Debug, Serialize)]
pub struct NewBlockDevice {
    pub datacenter_label: String,
    pub size_gib: u32,
}

#[derive(Debug, Deserialize)]
pub struct BlockDeviceResponse {
    pub block_device: UuidRef,
}

#[derive(Debug, Serialize)]
pub struct VmRequest {
    pub dry_run: bool,
    pub vm: NewVm,
}

#[derive(Debug, Serialize)]
pub struct NewVm {
    pub sku: String,
    pub ram: u32,
    pub gpu: u32,
    pub image: String,
    pub block_devices: Vec<UuidRef>,
    pub launch_bash_script: String,
}

#[derive(Debug, Deserialize)]
pub struct VmResponse {
    pub vm: UuidRef,
}

/// Body of `/vm/kill`.
#[derive(Debug, Serialize)]
pub struct VmAction {
    pub dry_run: bool,
    pub vm: UuidRef,
}

/// Body of `/block_device/release`.
#[derive(Debug, Serialize)]
pub struct BlockDeviceAction {
    pub dry_run: bool,
    pub block_device: UuidRef,
}

#[derive(Debug, Default, Serialize)]
pub struct VmListRequest {
    pub filters: VmFilters,
}

#[derive(Debug, Default, Serialize)]
pub struct VmFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VmListResponse {
    #[serde(default)]
    pub vms: Vec<Vm>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vm {
    pub uuid: String,
    #[serde(default)]
    pub status_str: String,
    #[serde(default)]
    pub block_devices: Vec<UuidRef>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub launch_bash_script: String,
    #[serde(default, deserialize_with = "timestamp")]
    pub started_on: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp")]
    pub kill_requested_on: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub vm_public_ipv4: String,
    #[serde(default)]
    pub vm_public_sshport: Option<u16>,
}

impl Vm {
    /// The hostname recorded in the launch script, if any.
    pub fn hostname(&self) -> Option<&str> {
        self.launch_bash_script
            .lines()
            .find_map(|line| line.trim().strip_prefix(HOSTNAME_MARKER))
            .map(str::trim)
    }

    /// Public address and SSH port, once both are assigned.
    pub fn ssh_endpoint(&self) -> Option<(&str, u16)> {
        match self.vm_public_sshport {
            Some(port) if port != 0 && !self.vm_public_ipv4.is_empty() => {
                Some((self.vm_public_ipv4.as_str(), port))
            }
            _ => None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started_on.is_some()
    }

    pub fn is_killed(&self) -> bool {
        self.kill_requested_on.is_some()
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts RFC 3339 or naive ISO 8601 (taken as UTC); anything else is unset.
fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc()))
}
