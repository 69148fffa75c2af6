//! Hostname resolution against the configured clouds.

use tracing::debug;

use crate::error::{BurstError, Result};
use crate::model::{Cloud, Config, Host};

/// A resolved host and the cloud that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<'a> {
    pub host: Host,
    pub cloud: &'a Cloud,
}

impl Config {
    /// Finds `hostname` by exact match.
    ///
    /// Clouds are searched in declaration order. Within a cloud, literal
    /// hosts are checked before group hosts, so a literal entry shadows a
    /// group member of the same name.
    pub fn resolve(&self, hostname: &str) -> Result<Resolved<'_>> {
        for cloud in &self.clouds {
            if let Some(host) = cloud.hosts.iter().find(|h| h.name == hostname) {
                return Ok(Resolved {
                    host: host.clone(),
                    cloud,
                });
            }

            for group in &cloud.groups_host {
                if !group.names().iter().any(|name| name == hostname) {
                    continue;
                }
                let host = group
                    .generate_hosts()?
                    .into_iter()
                    .find(|h| h.name == hostname)
                    .ok_or_else(|| BurstError::HostNotFound(hostname.to_string()))?;
                return Ok(Resolved { host, cloud });
            }
        }
        Err(BurstError::HostNotFound(hostname.to_string()))
    }

    /// Tries `hostname + suffix` for each configured suffix, then the bare
    /// hostname.
    pub fn resolve_with_suffixes(&self, hostname: &str) -> Result<Resolved<'_>> {
        for suffix in &self.suffix_search {
            let candidate = format!("{hostname}{suffix}");
            match self.resolve(&candidate) {
                Ok(resolved) => {
                    debug!(hostname, resolved = %candidate, "resolved with search suffix");
                    return Ok(resolved);
                }
                Err(BurstError::HostNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        self.resolve(hostname)
    }

    /// Every host of every cloud, literal hosts first within each cloud.
    pub fn all_hosts(&self) -> Result<Vec<Resolved<'_>>> {
        let mut out = Vec::new();
        for cloud in &self.clouds {
            out.extend(cloud.hosts.iter().map(|host| Resolved {
                host: host.clone(),
                cloud,
            }));
            for group in &cloud.groups_host {
                out.extend(
                    group
                        .generate_hosts()?
                        .into_iter()
                        .map(|host| Resolved { host, cloud }),
                );
            }
        }
        Ok(out)
    }

    /// `/etc/hosts` lines (`<ip> <name>`) for every host with an address.
    pub fn hosts_file(&self) -> Result<String> {
        let mut out = String::new();
        for resolved in self.all_hosts()? {
            if let Some(ip) = &resolved.host.ip {
                out.push_str(&format!("{} {}\n", ip, resolved.host.name));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::from_yaml_str;

    const CONFIG: &str = r#"
apiVersion: cloud-burster.squarefactory.io/v1alpha1
suffixSearch:
  - .cluster.local
  - .example.com
clouds:
  - type: openstack
    network:
      name: backend
      subnetCIDR: 172.28.0.0/20
      dns: 1.1.1.1
      gateway: 172.28.0.2
    hosts:
      - name: cn1
        diskSize: 30
        flavorName: d2-2
        imageName: Rocky Linux 9
        ip: 172.28.0.200
    groupsHost:
      - namePattern: cn[1-4]
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
      region: GRA9
  - type: exoscale
    network:
      name: private
      subnetCIDR: 172.29.0.0/20
      dns: 1.1.1.1
      gateway: 172.29.0.1
    hosts:
      - name: gpu1.example.com
        diskSize: 100
        flavorName: gpu2.small
        imageName: Rocky Linux 9
        ip: 172.29.0.10
      - name: cn3
        diskSize: 100
        flavorName: standard.large
        imageName: Rocky Linux 9
        ip: 172.29.0.11
    exoscale:
      apiKey: EXO123
      apiSecret: secret
      zone: ch-gva-2
"#;

    fn config() -> Config {
        from_yaml_str(CONFIG).unwrap()
    }

    #[test]
    fn test_resolve_literal_before_group() {
        let config = config();
        let resolved = config.resolve("cn1").unwrap();
        assert_eq!(resolved.host.ip.as_deref(), Some("172.28.0.200"));
        assert_eq!(resolved.host.flavor_name, "d2-2");
    }

    #[test]
    fn test_resolve_group_member() {
        let config = config();
        let resolved = config.resolve("cn2").unwrap();
        assert_eq!(resolved.host.ip.as_deref(), Some("172.28.0.12"));
        assert_eq!(resolved.host.disk_size, 50);
        assert_eq!(resolved.cloud.label(), "openstack/GRA9");
    }

    #[test]
    fn test_resolve_first_cloud_wins() {
        let config = config();
        let resolved = config.resolve("cn3").unwrap();
        assert_eq!(resolved.cloud.label(), "openstack/GRA9");
    }

    #[test]
    fn test_resolve_not_found() {
        let err = config().resolve("login1").unwrap_err();
        assert!(matches!(err, BurstError::HostNotFound(h) if h == "login1"));
    }

    #[test]
    fn test_resolve_with_suffixes() {
        let config = config();
        let resolved = config.resolve_with_suffixes("gpu1").unwrap();
        assert_eq!(resolved.host.name, "gpu1.example.com");
        assert_eq!(resolved.cloud.label(), "exoscale/ch-gva-2");
    }

    #[test]
    fn test_resolve_with_suffixes_falls_back_to_bare_name() {
        let config = config();
        let resolved = config.resolve_with_suffixes("cn4").unwrap();
        assert_eq!(resolved.host.name, "cn4");
    }

    #[test]
    fn test_resolve_with_suffixes_not_found() {
        let err = config().resolve_with_suffixes("nope").unwrap_err();
        assert!(matches!(err, BurstError::HostNotFound(_)));
    }

    #[test]
    fn test_all_hosts_and_hosts_file() {
        let config = config();
        let hosts = config.all_hosts().unwrap();
        assert_eq!(hosts.len(), 7);

        let file = config.hosts_file().unwrap();
        let lines: Vec<&str> = file.lines().collect();
        assert_eq!(lines[0], "172.28.0.200 cn1");
        assert_eq!(lines[1], "172.28.0.11 cn1");
        assert_eq!(lines[6], "172.29.0.11 cn3");
    }
}
