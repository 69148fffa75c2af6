//! Cloud-config user data for OpenStack servers

use burster_cloud::cloud_init;
use burster_core::{Cloud, Host};

use crate::error::Result;

/// `/dev/sdb` is the blank data volume attached at boot index 1.
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
  - [ sed, "-i", "-e", 's/SELINUX=enforcing/SELINUX=disabled/g', /etc/selinux/config ]
  - [ setenforce, "0" ]
  - [ mkfs.xfs, "/dev/sdb" ]
  - [ mkdir, -p, "/mnt/storage" ]
  - [ mount, "/dev/sdb", "/mnt/storage" ]
{%- if git_url and git_ref %}
  - mkdir -p /configs && GIT_SSH_COMMAND='ssh -i /key -o UserKnownHostsFile=/dev/null -o StrictHostKeyChecking=no -o IdentitiesOnly=yes' git clone -b {{ git_ref }} {{ git_url }} /configs
  - if [ -f /configs/post.sh ] && [ -x /configs/post.sh ]; then cd /configs && ./post.sh compute; fi
  - [ rm, -f, /key ]
  - [ chmod, -R, "g-rwx,o-rwx", /configs ]
{%- endif %}
  - [ touch, /etc/cloud/cloud-init.disabled ]

{{ custom_config }}
"#;

/// Renders the user data for `host`.
pub fn render(host: &Host, cloud: &Cloud) -> Result<String> {
    let context = cloud_init::base_context(host, cloud)?;
    Ok(cloud_init::render_cloud_config(CLOUD_CONFIG_TEMPLATE, &context)?)
}
