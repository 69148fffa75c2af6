use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::cidr;
use crate::error::Result;
use crate::pattern;

/// A single machine to provision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Disk size in GB.
    #[serde(default)]
    pub disk_size: u32,

    /// Memory in GB, for backends where it is not implied by the flavor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<u32>,

    #[serde(default)]
    pub flavor_name: String,

    #[serde(default)]
    pub image_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// A family of hosts sharing a template, named by a bracket pattern and
/// addressed sequentially from a CIDR block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupHost {
    #[serde(default)]
    pub name_pattern: String,

    #[serde(rename = "ipCIDR", default)]
    pub ip_cidr: String,

    #[serde(default)]
    pub ip_offset: usize,

    #[serde(default)]
    pub template: Host,
}

impl GroupHost {
    /// Names produced by the pattern, in expansion order.
    pub fn names(&self) -> Vec<String> {
        pattern::expand_brackets(&self.name_pattern)
    }

    /// Materializes every host of the group from the template.
    pub fn generate_hosts(&self) -> Result<Vec<Host>> {
        let assigned = cidr::assign_addresses(self.names(), &self.ip_cidr, self.ip_offset)?;
        Ok(assigned
            .into_iter()
            .map(|(name, ip)| self.host_from_template(name, ip))
            .collect())
    }

    fn host_from_template(&self, name: String, ip: Ipv4Addr) -> Host {
        Host {
            name,
            ip: Some(ip.to_string()),
            ..self.template.clone()
        }
    }
}
