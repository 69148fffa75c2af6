use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{GroupHost, Host, Network};
use crate::error::{BurstError, Result};

/// Supported backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudType {
    Openstack,
    Exoscale,
    Shadow,
}

impl CloudType {
    pub const ALL: [CloudType; 3] = [CloudType::Openstack, CloudType::Exoscale, CloudType::Shadow];

    pub fn as_str(&self) -> &'static str {
        match self {
            CloudType::Openstack => "openstack",
            CloudType::Exoscale => "exoscale",
            CloudType::Shadow => "shadow",
        }
    }
}

impl fmt::Display for CloudType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudType {
    type Err = BurstError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "openstack" => Ok(CloudType::Openstack),
            "exoscale" => Ok(CloudType::Exoscale),
            "shadow" => Ok(CloudType::Shadow),
            other => Err(BurstError::UnknownCloudType(other.to_string())),
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenstackCredentials {
    #[serde(default)]
    pub identity_endpoint: String,
    #[serde(default, alias = "username")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "tenantID", default)]
    pub tenant_id: String,
    #[serde(default)]
    pub tenant_name: String,
    #[serde(rename = "domainID", default)]
    pub domain_id: String,
    #[serde(default)]
    pub region: String,
}

impl fmt::Debug for OpenstackCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenstackCredentials")
            .field("identity_endpoint", &self.identity_endpoint)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("tenant_name", &self.tenant_name)
            .field("domain_id", &self.domain_id)
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExoscaleCredentials {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub zone: String,
}

impl fmt::Debug for ExoscaleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExoscaleCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("zone", &self.zone)
            .finish()
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub zone: String,
    /// Base64-encoded private key used to reach VMs over SSH.
    #[serde(rename = "sshkey", default)]
    pub ssh_key: String,
}

impl fmt::Debug for ShadowCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("zone", &self.zone)
            .field("ssh_key", &"<redacted>")
            .finish()
    }
}

/// Provider-specific settings; exactly one per cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudKind {
    Openstack(OpenstackCredentials),
    Exoscale(ExoscaleCredentials),
    Shadow(ShadowCredentials),
}

impl CloudKind {
    pub fn cloud_type(&self) -> CloudType {
        match self {
            CloudKind::Openstack(_) => CloudType::Openstack,
            CloudKind::Exoscale(_) => CloudType::Exoscale,
            CloudKind::Shadow(_) => CloudType::Shadow,
        }
    }
}

/// Git repository cloned on first boot, whose `post.sh` is then executed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitPostScript {
    /// Base64-encoded deploy key.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "ref", default)]
    pub git_ref: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostScripts {
    #[serde(default)]
    pub git: GitPostScript,
}

/// A cloud as written in the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSpec {
    #[serde(rename = "type", default)]
    pub cloud_type: String,
    #[serde(default)]
    pub authorized_keys: Vec<String>,
    #[serde(default)]
    pub post_scripts: PostScripts,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub groups_host: Vec<GroupHost>,
    #[serde(default)]
    pub hosts: Vec<Host>,
    #[serde(default)]
    pub custom_config: Option<serde_yaml::Mapping>,
    #[serde(default)]
    pub openstack: Option<OpenstackCredentials>,
    #[serde(default)]
    pub exoscale: Option<ExoscaleCredentials>,
    #[serde(default)]
    pub shadow: Option<ShadowCredentials>,
}

/// A provider account and the hosts it can run.
#[derive(Debug, Clone, PartialEq)]
pub struct Cloud {
    pub authorized_keys: Vec<String>,
    pub post_scripts: PostScripts,
    pub network: Network,
    pub groups_host: Vec<GroupHost>,
    pub hosts: Vec<Host>,
    /// Extra cloud-init keys appended verbatim to the generated user data.
    pub custom_config: Option<serde_yaml::Mapping>,
    pub kind: CloudKind,
}

impl Cloud {
    pub fn cloud_type(&self) -> CloudType {
        self.kind.cloud_type()
    }

    /// Short label for logs, e.g. `openstack/GRA9`.
    pub fn label(&self) -> String {
        let location = match &self.kind {
            CloudKind::Openstack(c) => c.region.as_str(),
            CloudKind::Exoscale(c) => c.zone.as_str(),
            CloudKind::Shadow(c) => c.zone.as_str(),
        };
        format!("{}/{}", self.cloud_type(), location)
    }
}

impl TryFrom<CloudSpec> for Cloud {
    type Error = BurstError;

    fn try_from(spec: CloudSpec) -> Result<Self> {
        let cloud_type: CloudType = spec.cloud_type.parse()?;
        let missing = || BurstError::MissingCredentials(cloud_type.to_string());

        let kind = match cloud_type {
            CloudType::Openstack => CloudKind::Openstack(spec.openstack.ok_or_else(missing)?),
            CloudType::Exoscale => CloudKind::Exoscale(spec.exoscale.ok_or_else(missing)?),
            CloudType::Shadow => CloudKind::Shadow(spec.shadow.ok_or_else(missing)?),
        };

        Ok(Cloud {
            authorized_keys: spec.authorized_keys,
            post_scripts: spec.post_scripts,
            network: spec.network,
            groups_host: spec.groups_host,
            hosts: spec.hosts,
            custom_config: spec.custom_config,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_type_from_str() {
        assert_eq!("openstack".parse::<CloudType>().unwrap(), CloudType::Openstack);
        assert_eq!("shadow".parse::<CloudType>().unwrap(), CloudType::Shadow);
        assert!(matches!(
            "aws".parse::<CloudType>(),
            Err(BurstError::UnknownCloudType(t)) if t == "aws"
        ));
    }

    #[test]
    fn test_cloud_from_spec_picks_matching_section() {
        let spec = CloudSpec {
            cloud_type: "exoscale".to_string(),
            exoscale: Some(ExoscaleCredentials {
                api_key: "EXO123".to_string(),
                api_secret: "secret".to_string(),
                zone: "ch-gva-2".to_string(),
            }),
            ..Default::default()
        };
        let cloud = Cloud::try_from(spec).unwrap();
        assert_eq!(cloud.cloud_type(), CloudType::Exoscale);
        assert_eq!(cloud.label(), "exoscale/ch-gva-2");
    }

    #[test]
    fn test_cloud_from_spec_missing_section() {
        let spec = CloudSpec {
            cloud_type: "openstack".to_string(),
            exoscale: Some(ExoscaleCredentials::default()),
            ..Default::default()
        };
        let err = Cloud::try_from(spec).unwrap_err();
        assert!(matches!(err, BurstError::MissingCredentials(t) if t == "openstack"));
    }

    #[test]
    fn test_openstack_credentials_ignore_unused_keys() {
        let creds: OpenstackCredentials = serde_yaml::from_str(
            "enabled: true\nidentityEndpoint: https://auth\nusername: burst\ntenantID: t1\nregion: GRA9\n",
        )
        .unwrap();
        assert_eq!(creds.user, "burst");
        assert_eq!(creds.tenant_id, "t1");
        assert_eq!(creds.region, "GRA9");
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = ShadowCredentials {
            username: "burst".to_string(),
            password: "hunter2".to_string(),
            zone: "fr".to_string(),
            ssh_key: "a2V5".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("burst"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("a2V5"));
    }
}
