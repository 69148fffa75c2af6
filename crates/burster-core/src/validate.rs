//! Structured configuration validation.
//!
//! Each entity reports its own violations with field paths relative to
//! itself; parents prefix them (`clouds[0].network.dns`).

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use crate::cidr::Ipv4Network;
use crate::error::{BurstError, Result};
use crate::model::{
    API_VERSION, Cloud, CloudKind, Config, ExoscaleCredentials, GroupHost, Host, Network,
    OpenstackCredentials, ShadowCredentials,
};

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub trait Validate {
    fn violations(&self) -> Vec<Violation>;
}

#[derive(Default)]
struct Violations(Vec<Violation>);

impl Violations {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(Violation {
            field: field.into(),
            message: message.into(),
        });
    }

    fn nested(&mut self, prefix: &str, inner: Vec<Violation>) {
        self.0.extend(inner.into_iter().map(|v| Violation {
            field: format!("{prefix}.{}", v.field),
            message: v.message,
        }));
    }

    fn required(&mut self, field: &str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.push(field, "is required");
            false
        } else {
            true
        }
    }

    fn required_ip(&mut self, field: &str, value: &str) {
        if self.required(field, value) {
            self.ip(field, value);
        }
    }

    fn ip(&mut self, field: &str, value: &str) {
        if value.parse::<IpAddr>().is_err() {
            self.push(field, format!("'{value}' is not a valid IP address"));
        }
    }

    fn cidr(&mut self, field: &str, value: &str) {
        if self.required(field, value) && value.parse::<Ipv4Network>().is_err() {
            self.push(field, format!("'{value}' is not a valid IPv4 CIDR"));
        }
    }

    fn url(&mut self, field: &str, value: &str) {
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            self.push(field, format!("'{value}' is not an http(s) URL"));
        }
    }
}

impl Validate for Host {
    fn violations(&self) -> Vec<Violation> {
        let mut v = Violations::default();
        if self.disk_size == 0 {
            v.push("diskSize", "is required");
        }
        v.required("flavorName", &self.flavor_name);
        v.required("imageName", &self.image_name);
        if let Some(ip) = &self.ip {
            v.ip("ip", ip);
        }
        v.0
    }
}

impl Validate for Network {
    fn violations(&self) -> Vec<Violation> {
        let mut v = Violations::default();
        v.required("name", &self.name);
        v.cidr("subnetCIDR", &self.subnet_cidr);
        v.required_ip("dns", &self.dns);
        v.required_ip("gateway", &self.gateway);
        v.0
    }
}

impl Validate for GroupHost {
    fn violations(&self) -> Vec<Violation> {
        let mut v = Violations::default();
        if v.required("namePattern", &self.name_pattern) && self.names().is_empty() {
            v.push(
                "namePattern",
                format!("'{}' does not expand to any hostname", self.name_pattern),
            );
        }
        v.cidr("ipCIDR", &self.ip_cidr);
        v.nested("template", self.template.violations());

        if v.0.is_empty()
            && let Err(e @ BurstError::InsufficientAddressSpace { .. }) = self.generate_hosts()
        {
            v.push("ipCIDR", e.to_string());
        }
        v.0
    }
}

impl Validate for OpenstackCredentials {
    fn violations(&self) -> Vec<Violation> {
        let mut v = Violations::default();
        if v.required("identityEndpoint", &self.identity_endpoint) {
            v.url("identityEndpoint", &self.identity_endpoint);
        }
        v.required("user", &self.user);
        v.required("password", &self.password);
        v.required("region", &self.region);
        if self.tenant_id.is_empty() && self.tenant_name.is_empty() {
            v.push("tenantID", "tenantID or tenantName is required");
        }
        v.0
    }
}

impl Validate for ExoscaleCredentials {
    fn violations(&self) -> Vec<Violation> {
        let mut v = Violations::default();
        v.required("apiKey", &self.api_key);
        v.required("apiSecret", &self.api_secret);
        v.required("zone", &self.zone);
        v.0
    }
}

impl Validate for ShadowCredentials {
    fn violations(&self) -> Vec<Violation> {
        let mut v = Violations::default();
        v.required("username", &self.username);
        v.required("password", &self.password);
        v.required("zone", &self.zone);
        v.required("sshkey", &self.ssh_key);
        v.0
    }
}

impl Validate for Cloud {
    fn violations(&self) -> Vec<Violation> {
        let mut v = Violations::default();
        v.nested("network", self.network.violations());

        for (i, host) in self.hosts.iter().enumerate() {
            let prefix = format!("hosts[{i}]");
            v.required(&format!("{prefix}.name"), &host.name);
            v.nested(&prefix, host.violations());
        }
        for (i, group) in self.groups_host.iter().enumerate() {
            v.nested(&format!("groupsHost[{i}]"), group.violations());
        }

        match &self.kind {
            CloudKind::Openstack(c) => v.nested("openstack", c.violations()),
            CloudKind::Exoscale(c) => v.nested("exoscale", c.violations()),
            CloudKind::Shadow(c) => v.nested("shadow", c.violations()),
        }
        v.0
    }
}

impl Validate for Config {
    fn violations(&self) -> Vec<Violation> {
        let mut v = Violations::default();
        if self.api_version != API_VERSION {
            v.push(
                "apiVersion",
                format!("expected '{API_VERSION}', got '{}'", self.api_version),
            );
        }
        for (i, cloud) in self.clouds.iter().enumerate() {
            v.nested(&format!("clouds[{i}]"), cloud.violations());
        }
        duplicate_hostnames(self, &mut v);
        v.0
    }
}

/// Hostnames declared more than once anywhere in the configuration.
fn duplicate_hostnames(config: &Config, v: &mut Violations) {
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut check = |name: String, location: String, v: &mut Violations| {
        if name.is_empty() {
            return;
        }
        match seen.get(&name) {
            Some(first) => v.push(
                location,
                format!("hostname '{name}' is already declared at {first}"),
            ),
            None => {
                seen.insert(name, location);
            }
        }
    };

    for (c, cloud) in config.clouds.iter().enumerate() {
        for (h, host) in cloud.hosts.iter().enumerate() {
            check(host.name.clone(), format!("clouds[{c}].hosts[{h}]"), v);
        }
        for (g, group) in cloud.groups_host.iter().enumerate() {
            for name in group.names() {
                check(name, format!("clouds[{c}].groupsHost[{g}]"), v);
            }
        }
    }
}

impl Config {
    /// Checks the whole configuration, reporting every violation at once.
    pub fn validate(&self) -> Result<()> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(BurstError::Invalid(violations))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::from_yaml_str;

    const VALID: &str = r#"
apiVersion: cloud-burster.squarefactory.io/v1alpha1
clouds:
  - type: openstack
    authorizedKeys:
      - ssh-ed25519 AAAA burst@admin
    network:
      name: backend
      subnetCIDR: 172.28.0.0/20
      dns: 1.1.1.1
      search: example.com
      gateway: 172.28.0.2
    hosts:
      - name: login1
        diskSize: 30
        flavorName: d2-2
        imageName: Rocky Linux 9
        ip: 172.28.0.5
    groupsHost:
      - namePattern: cn[1-10]
        ipCIDR: 172.28.0.0/20
        ipOffset: 10
        template:
          diskSize: 50
          flavorName: d2-4
          imageName: Rocky Linux 9
    openstack:
      identityEndpoint: https://auth.cloud.ovh.net/
      user: burst
      password: secret
      tenantID: abc
      region: GRA9
"#;

    fn fields(err: BurstError) -> Vec<String> {
        match err {
            BurstError::Invalid(violations) => violations.into_iter().map(|v| v.field).collect(),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_config() {
        from_yaml_str(VALID).unwrap().validate().unwrap();
    }

    #[test]
    fn test_wrong_api_version() {
        let yaml = VALID.replace("v1alpha1", "v2");
        let err = from_yaml_str(&yaml).unwrap().validate().unwrap_err();
        assert_eq!(fields(err), vec!["apiVersion"]);
    }

    #[test]
    fn test_nested_field_paths() {
        let yaml = VALID
            .replace("dns: 1.1.1.1", "dns: not-an-ip")
            .replace("ip: 172.28.0.5", "ip: 300.1.1.1");
        let err = from_yaml_str(&yaml).unwrap().validate().unwrap_err();
        assert_eq!(
            fields(err),
            vec!["clouds[0].network.dns", "clouds[0].hosts[0].ip"]
        );
    }

    #[test]
    fn test_missing_required_fields() {
        let host = Host::default();
        let fields: Vec<_> = host.violations().into_iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["diskSize", "flavorName", "imageName"]);

        let network = Network::default();
        assert_eq!(network.violations().len(), 4);
    }

    #[test]
    fn test_group_address_space_violation() {
        let yaml = VALID.replace("cn[1-10]", "cn[1-5000]");
        let err = from_yaml_str(&yaml).unwrap().validate().unwrap_err();
        assert_eq!(fields(err), vec!["clouds[0].groupsHost[0].ipCIDR"]);
    }

    #[test]
    fn test_duplicate_hostnames() {
        let yaml = VALID.replace("name: login1", "name: cn3");
        let err = from_yaml_str(&yaml).unwrap().validate().unwrap_err();
        match err {
            BurstError::Invalid(violations) => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].field, "clouds[0].groupsHost[0]");
                assert!(violations[0].message.contains("'cn3'"));
                assert!(violations[0].message.contains("clouds[0].hosts[0]"));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_error_lists_every_violation() {
        let yaml = VALID
            .replace("v1alpha1", "v0")
            .replace("gateway: 172.28.0.2", "gateway: ''");
        let err = from_yaml_str(&yaml).unwrap().validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("apiVersion"));
        assert!(message.contains("clouds[0].network.gateway: is required"));
    }
}
