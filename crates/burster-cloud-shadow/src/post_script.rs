//! Bash post-provisioning script for Shadow VMs
//!
//! Shadow images do not run cloud-init, so the equivalent steps are piped to
//! `bash` over SSH once the VM is reachable. `$1` is the node role.

use burster_cloud::cloud_init;
use burster_core::{Cloud, Host};

use crate::error::Result;

pub const POST_SCRIPT_TEMPLATE: &str = r#"#!/bin/bash
set -ex

hostnamectl set-hostname {{ hostname }}
{%- if git_url and git_ref %}

cat << 'EOF' > /key
{{ git_key_pem }}
EOF
chmod 600 /key

mkdir -p /configs
GIT_SSH_COMMAND='ssh -i /key -o IdentitiesOnly=yes -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null' git clone -b {{ git_ref }} {{ git_url }} /configs
if [ -f /configs/post.sh ] && [ -x /configs/post.sh ]; then
	cd /configs || exit 1
	./post.sh "$1"
fi
rm -f /key
chmod -R g-rwx,o-rwx /configs
{%- endif %}
"#;

pub fn render(host: &Host, cloud: &Cloud) -> Result<String> {
    let mut context = cloud_init::base_context(host, cloud)?;
    let key = &cloud.post_scripts.git.key;
    let pem = if key.is_empty() {
        String::new()
    } else {
        cloud_init::decode_base64(key)?
    };
    context.insert("git_key_pem", pem.trim_end());
    Ok(cloud_init::render(POST_SCRIPT_TEMPLATE, &context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burster_core::{CloudKind, GitPostScript, Network, PostScripts, ShadowCredentials};

    fn cloud(git: GitPostScript) -> Cloud {
        Cloud {
            authorized_keys: vec![],
            post_scripts: PostScripts { git },
            network: Network::default(),
            groups_host: vec![],
            hosts: vec![],
            custom_config: None,
            kind: CloudKind::Shadow(ShadowCredentials::default()),
        }
    }

    fn host() -> Host {
        Host {
            name: "gpu-1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_with_post_scripts() {
        let git = GitPostScript {
            // "-----BEGIN KEY-----\n"
            key: "LS0tLS1CRUdJTiBLRVktLS0tLQo=".to_string(),
            url: "git@github.com:example/postscripts.git".to_string(),
            git_ref: "main".to_string(),
        };
        let out = render(&host(), &cloud(git)).unwrap();

        assert!(out.starts_with("#!/bin/bash\nset -ex\n"));
        assert!(out.contains("hostnamectl set-hostname gpu-1\n"));
        assert!(out.contains("cat << 'EOF' > /key\n-----BEGIN KEY-----\nEOF\n"));
        assert!(out.contains("git clone -b main git@github.com:example/postscripts.git /configs"));
        assert!(out.contains("./post.sh \"$1\""));
    }

    #[test]
    fn test_render_without_post_scripts() {
        let out = render(&host(), &cloud(GitPostScript::default())).unwrap();
        assert!(out.contains("hostnamectl set-hostname gpu-1"));
        assert!(!out.contains("/key"));
        assert!(!out.contains("git clone"));
    }

    #[test]
    fn test_render_rejects_bad_key() {
        let git = GitPostScript {
            key: "not base64!".to_string(),
            url: "git@github.com:example/postscripts.git".to_string(),
            git_ref: "main".to_string(),
        };
        assert!(render(&host(), &cloud(git)).is_err());
    }
}
