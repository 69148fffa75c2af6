//! Cloud-config user data for Exoscale instances
//!
//! Private networks on Exoscale have no DHCP, so the static address is
//! applied with nmcli on first boot.

use burster_cloud::cloud_init;
use burster_core::{Cloud, Host, Ipv4Network};

use crate::error::{ExoscaleError, Result};

pub const CLOUD_CONFIG_TEMPLATE: &str = r#"#cloud-config
disable_root: false

ssh_authorized_keys:
{%- for key in authorized_keys %}
  - {{ key }}
{%- endfor %}

write_files:
  - path: /etc/systemd/resolved.conf
    content: |
      [Resolve]
      DNS={{ dns }}
      DNSStubListener=no

  - path: /etc/NetworkManager/NetworkManager.conf
    content: |
      [main]
      plugins = ifcfg-rh
      dns = none

      [logging]

  - path: /etc/resolv.conf
    content: |
      nameserver {{ dns }}
{%- if search %}
      search {{ search }}
{%- endif %}
{%- if git_key %}

  - path: /key
    content: {{ git_key }}
    encoding: b64
    permissions: '0600'
{%- endif %}

runcmd:
  - [ systemctl, restart, NetworkManager ]
  - [ systemctl, stop, firewalld ]
  - [ systemctl, disable, firewalld ]
  - [ growpart, "/dev/vda", "2" ]
  - [ xfs_growfs, "/" ]
  - [ resize2fs, "/dev/vda2" ]
  - [ nmcli, connection, modify, "Wired connection 1", connection.autoconnect, "yes" ]
  - [ nmcli, connection, modify, "Wired connection 1", ipv4.addresses, "{{ address_cidr }}" ]
  - [ nmcli, connection, modify, "Wired connection 1", ipv4.gateway, "{{ gateway }}" ]
  - [ nmcli, connection, modify, "Wired connection 1", ipv4.route-metric, "1" ]
  - [ nmcli, connection, modify, "Wired connection 1", ipv4.never-default, "no" ]
  - [ nmcli, connection, modify, "Wired connection 1", ipv4.method, manual ]
  - [ nmcli, connection, up, "Wired connection 1" ]
  - [ nmcli, connection, down, "System ens3" ]
  - [ nmcli, connection, modify, "System ens3", connection.autoconnect, "no" ]
  - [ sed, "-i", "-e", 's/SELINUX=enforcing/SELINUX=disabled/g', /etc/selinux/config ]
  - [ setenforce, "0" ]
{%- if git_url and git_ref %}
  - mkdir -p /configs && GIT_SSH_COMMAND='ssh -i /key -o UserKnownHostsFile=/dev/null -o StrictHostKeyChecking=no -o IdentitiesOnly=yes' git clone -b {{ git_ref }} {{ git_url }} /configs
  - if [ -f /configs/post.sh ] && [ -x /configs/post.sh ]; then cd /configs && ./post.sh compute; fi
  - [ rm, -f, /key ]
  - [ chmod, -R, "g-rwx,o-rwx", /configs ]
{%- endif %}
  - [ touch, /etc/cloud/cloud-init.disabled ]

{{ custom_config }}
"#;

/// `<ip>/<prefix>` of `host` within the cloud's subnet.
pub fn address_cidr(host: &Host, cloud: &Cloud) -> Result<String> {
    let ip = host
        .ip
        .as_deref()
        .ok_or_else(|| ExoscaleError::MissingAddress(host.name.clone()))?;
    let subnet: Ipv4Network = cloud
        .network
        .subnet_cidr
        .parse()
        .map_err(burster_cloud::CloudError::from)?;
    Ok(format!("{ip}/{}", subnet.prefix_len()))
}

/// Renders the user data for `host`.
pub fn render(host: &Host, cloud: &Cloud) -> Result<String> {
    let mut context = cloud_init::base_context(host, cloud)?;
    context.insert("address_cidr", &address_cidr(host, cloud)?);
    context.insert("gateway", &cloud.network.gateway);
    Ok(cloud_init::render_cloud_config(CLOUD_CONFIG_TEMPLATE, &context)?)
}
