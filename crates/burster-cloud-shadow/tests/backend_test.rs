//! Shadow backend tests against a mocked API and a scripted ssh client.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use burster_cloud::retry::RetryPolicy;
use burster_cloud::{Backend, CancellationToken, CloudError};
use burster_cloud_shadow::{ShadowBackend, ShadowClient, ShadowPolicies, Ssh};
use burster_core::{
    Cloud, CloudKind, GitPostScript, Host, Network, PostScripts, ShadowCredentials,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> ShadowCredentials {
    ShadowCredentials {
        username: "burst".to_string(),
        password: "secret".to_string(),
        zone: "fr-par-1".to_string(),
        // "-----BEGIN KEY-----\n"
        ssh_key: "LS0tLS1CRUdJTiBLRVktLS0tLQo=".to_string(),
    }
}

/// An `ssh` stand-in that records its arguments and stdin, then exits with
/// `status`.
fn fake_ssh(dir: &TempDir, status: i32) -> Ssh {
    let root = dir.path().display();
    let script = format!(
        "#!/bin/sh\necho \"$*\" > '{root}/args'\ncat > '{root}/stdin'\necho 'post-script output'\nexit {status}\n"
    );
    let path = dir.path().join("ssh");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    Ssh::new().with_program(path.to_string_lossy())
}

fn backend(server: &MockServer, ssh: Ssh) -> ShadowBackend {
    let quick = RetryPolicy::new(3, Duration::from_millis(10));
    let policies = ShadowPolicies {
        ready: quick,
        locate: quick,
        storage_settle: Duration::from_millis(1),
        kill_settle: Duration::from_millis(1),
    };
    let client = ShadowClient::new(&credentials()).with_base_url(format!("{}/api", server.uri()));
    ShadowBackend::with_parts(&credentials(), client, ssh, policies)
}

fn cloud() -> Cloud {
    Cloud {
        authorized_keys: vec![],
        post_scripts: PostScripts {
            git: GitPostScript {
                key: "LS0tLS1CRUdJTiBLRVktLS0tLQo=".to_string(),
                url: "git@github.com:example/postscripts.git".to_string(),
                git_ref: "main".to_string(),
            },
        },
        network: Network::default(),
        groups_host: vec![],
        hosts: vec![],
        custom_config: None,
        kind: CloudKind::Shadow(credentials()),
    }
}

fn host() -> Host {
    Host {
        name: "gpu-1".to_string(),
        disk_size: 200,
        flavor_name: "VM-A4500".to_string(),
        image_name: "rocky-9".to_string(),
        ..Default::default()
    }
}

fn vm(uuid: &str, hostname: &str, ip: &str, port: u16) -> serde_json::Value {
    json!({
        "uuid": uuid,
        "status_str": "running",
        "block_devices": [{"uuid": "bd-1"}],
        "launch_bash_script": format!("#!/bin/bash\n# cloud-burster hostname: {hostname}\n"),
        "started_on": "2024-03-01T10:00:00",
        "kill_requested_on": null,
        "vm_public_ipv4": ip,
        "vm_public_sshport": port
    })
}

async fn mount_create(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/block_device/request"))
        .and(header("authorization", "Basic YnVyc3Q6c2VjcmV0"))
        .and(body_partial_json(json!({
            "dry_run": false,
            "block_device": {"datacenter_label": "fr-par-1", "size_gib": 200}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"block_device": {"uuid": "bd-1"}})),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_provisions_and_runs_post_script() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_create(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/vm/request"))
        .and(body_partial_json(json!({
            "vm": {
                "sku": "VM-A4500",
                "ram": 112,
                "gpu": 1,
                "image": "rocky-9",
                "block_devices": [{"uuid": "bd-1"}]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vm": {"uuid": "vm-1"}})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/vm/list"))
        .and(body_partial_json(json!({"filters": {"uuid": "vm-1"}})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"vms": [vm("vm-1", "gpu-1", "203.0.113.7", 2222)]})),
        )
        .mount(&server)
        .await;

    backend(&server, fake_ssh(&dir, 0))
        .create(&CancellationToken::new(), &host(), &cloud())
        .await
        .unwrap();

    let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
    assert!(args.contains("-p 2222"));
    assert!(args.contains("root@203.0.113.7 bash -s -- compute"));

    let stdin = std::fs::read_to_string(dir.path().join("stdin")).unwrap();
    assert!(stdin.contains("hostnamectl set-hostname gpu-1"));
    assert!(stdin.contains("-----BEGIN KEY-----"));
}

#[tokio::test]
async fn test_create_sends_launch_script_marker_and_host_overrides() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_create(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/vm/request"))
        .and(body_partial_json(json!({
            "vm": {
                "ram": 64,
                "gpu": 2,
                "launch_bash_script": "#!/bin/bash\n# cloud-burster hostname: gpu-1\n"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vm": {"uuid": "vm-1"}})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/vm/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"vms": [vm("vm-1", "gpu-1", "203.0.113.7", 2222)]})),
        )
        .mount(&server)
        .await;

    let host = Host {
        ram: Some(64),
        gpu: Some(2),
        ..host()
    };
    backend(&server, fake_ssh(&dir, 0))
        .create(&CancellationToken::new(), &host, &cloud())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_releases_storage_when_vm_request_fails() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_create(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/vm/request"))
        .respond_with(ResponseTemplate::new(409).set_body_string("no capacity"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/block_device/release"))
        .and(body_partial_json(json!({"block_device": {"uuid": "bd-1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let err = backend(&server, fake_ssh(&dir, 0))
        .create(&CancellationToken::new(), &host(), &cloud())
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Backend { provider: "shadow", .. }));
    assert!(err.to_string().contains("no capacity"));
}

#[tokio::test]
async fn test_create_gives_up_without_public_address() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_create(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/vm/request"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vm": {"uuid": "vm-1"}})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/vm/list"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"vms": [vm("vm-1", "gpu-1", "", 0)]})),
        )
        .expect(3)
        .mount(&server)
        .await;

    let err = backend(&server, fake_ssh(&dir, 0))
        .create(&CancellationToken::new(), &host(), &cloud())
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::PollExhausted { attempts: 3, .. }));
    assert!(!dir.path().join("args").exists());
}

#[tokio::test]
async fn test_create_reports_post_script_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_create(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/vm/request"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vm": {"uuid": "vm-1"}})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/vm/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"vms": [vm("vm-1", "gpu-1", "203.0.113.7", 2222)]})),
        )
        .mount(&server)
        .await;

    let err = backend(&server, fake_ssh(&dir, 3))
        .create(&CancellationToken::new(), &host(), &cloud())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("post-script failed"));
    assert!(err.to_string().contains("post-script output"));
}

#[tokio::test]
async fn test_delete_absent_vm_is_idempotent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/vm/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"vms": [vm("vm-9", "other", "203.0.113.9", 22)]})),
        )
        .expect(6)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/vm/kill"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let backend = backend(&server, fake_ssh(&dir, 0));
    let cancel = CancellationToken::new();
    backend.delete(&cancel, "gpu-1").await.unwrap();
    backend.delete(&cancel, "gpu-1").await.unwrap();
}

#[tokio::test]
async fn test_delete_kills_vm_then_releases_storage() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/vm/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vms": [
                vm("vm-9", "other", "203.0.113.9", 22),
                vm("vm-1", "gpu-1", "203.0.113.7", 2222)
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/vm/kill"))
        .and(body_partial_json(json!({"dry_run": false, "vm": {"uuid": "vm-1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/block_device/release"))
        .and(body_partial_json(json!({"block_device": {"uuid": "bd-1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server, fake_ssh(&dir, 0))
        .delete(&CancellationToken::new(), "gpu-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_skips_vm_already_being_killed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut killed = vm("vm-1", "gpu-1", "203.0.113.7", 2222);
    killed["kill_requested_on"] = json!("2024-03-01T11:00:00Z");
    Mock::given(method("POST"))
        .and(path("/api/vm/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vms": [killed]})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/vm/kill"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    backend(&server, fake_ssh(&dir, 0))
        .delete(&CancellationToken::new(), "gpu-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_cancelled() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = backend(&server, fake_ssh(&dir, 0))
        .delete(&cancel, "gpu-1")
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Cancelled));
}
