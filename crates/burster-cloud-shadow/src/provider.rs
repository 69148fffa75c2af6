//! Shadow backend implementation

use std::time::Duration;

use async_trait::async_trait;
use burster_cloud::retry::{self, RetryError, RetryPolicy};
use burster_cloud::{Backend, CancellationToken, CloudError, cloud_init};
use burster_core::{Cloud, Host, ShadowCredentials};
use tracing::{error, info, instrument, warn};

use crate::client::ShadowClient;
use crate::error::{Result, ShadowError};
use crate::models::{NewVm, UuidRef, hostname_marker};
use crate::post_script;
use crate::ssh::Ssh;

/// Used when the host does not set `ram`.
pub const DEFAULT_RAM_GB: u32 = 112;
/// Used when the host does not set `gpu`.
pub const DEFAULT_GPU_COUNT: u32 = 1;

/// Role passed to the repository's `post.sh`.
const NODE_ROLE: &str = "compute";

#[derive(Debug, Clone, Copy)]
pub struct ShadowPolicies {
    /// Waiting for a public address and SSH port.
    pub ready: RetryPolicy,
    /// Finding the VM by hostname before deleting it.
    pub locate: RetryPolicy,
    /// Pause between allocating storage and requesting the VM.
    pub storage_settle: Duration,
    /// Pause between killing the VM and releasing its storage.
    pub kill_settle: Duration,
}

impl Default for ShadowPolicies {
    fn default() -> Self {
        Self {
            ready: RetryPolicy::secs(10, 10),
            locate: RetryPolicy::secs(3, 5),
            storage_settle: Duration::from_secs(5),
            kill_settle: Duration::from_secs(10),
        }
    }
}

pub struct ShadowBackend {
    client: ShadowClient,
    ssh: Ssh,
    zone: String,
    ssh_key: String,
    policies: ShadowPolicies,
}

impl ShadowBackend {
    pub fn new(credentials: &ShadowCredentials) -> Self {
        Self::with_parts(
            credentials,
            ShadowClient::new(credentials),
            Ssh::new(),
            ShadowPolicies::default(),
        )
    }

    pub fn with_parts(
        credentials: &ShadowCredentials,
        client: ShadowClient,
        ssh: Ssh,
        policies: ShadowPolicies,
    ) -> Self {
        Self {
            client,
            ssh,
            zone: credentials.zone.clone(),
            ssh_key: credentials.ssh_key.clone(),
            policies,
        }
    }

    #[instrument(skip_all, fields(host = %host.name, zone = %self.zone))]
    async fn create_vm(&self, cancel: &CancellationToken, host: &Host, cloud: &Cloud) -> Result<()> {
        let private_key = cloud_init::decode_base64(&self.ssh_key)?;
        let script = post_script::render(host, cloud)?;

        let block_device = self
            .client
            .request_block_device(&self.zone, host.disk_size)
            .await?;
        info!(block_device = %block_device, size_gib = host.disk_size, "Allocated block device");

        if !retry::sleep(cancel, self.policies.storage_settle).await {
            self.release_quietly(&block_device).await;
            return Err(CloudError::Cancelled.into());
        }

        let request = NewVm {
            sku: host.flavor_name.clone(),
            ram: host.ram.unwrap_or(DEFAULT_RAM_GB),
            gpu: host.gpu.unwrap_or(DEFAULT_GPU_COUNT),
            image: host.image_name.clone(),
            block_devices: vec![UuidRef::new(block_device.as_str())],
            launch_bash_script: format!("#!/bin/bash\n{}\n", hostname_marker(&host.name)),
        };
        let vm_uuid = match self.client.request_vm(request).await {
            Ok(uuid) => uuid,
            Err(e) => {
                self.release_quietly(&block_device).await;
                return Err(e);
            }
        };
        info!(vm = %vm_uuid, "Requested VM");

        let client = &self.client;
        let uuid = vm_uuid.as_str();
        let (address, port) = retry::attempt(cancel, self.policies.ready, move || async move {
            let vm = client.get_vm(uuid).await?;
            match vm.ssh_endpoint() {
                Some((address, port)) => Ok((address.to_string(), port)),
                None => Err(ShadowError::NotReady(vm.uuid)),
            }
        })
        .await
        .map_err(CloudError::from)?;
        info!(vm = %vm_uuid, address = %address, port, "VM is reachable");

        match self
            .ssh
            .run_script(&private_key, &address, port, &script, &[NODE_ROLE])
            .await
        {
            Ok(output) => {
                info!(vm = %vm_uuid, "Post-script completed");
                tracing::debug!(output = %output, "Post-script output");
                Ok(())
            }
            Err(e) => {
                error!(vm = %vm_uuid, error = %e, "Post-script failed");
                Err(e)
            }
        }
    }

    #[instrument(skip_all, fields(host = %name, zone = %self.zone))]
    async fn delete_vm(&self, cancel: &CancellationToken, name: &str) -> Result<()> {
        warn!("Deleting VM");
        let client = &self.client;
        let vm = match retry::attempt(cancel, self.policies.locate, move || {
            client.find_vm_by_hostname(name)
        })
        .await
        {
            Ok(vm) => vm,
            Err(RetryError::Exhausted { last, .. }) if last.is_not_found() => {
                info!("VM already absent");
                return Ok(());
            }
            Err(e) => return Err(CloudError::from(e).into()),
        };

        if vm.is_killed() {
            info!(vm = %vm.uuid, "VM is already being killed");
            return Ok(());
        }

        self.client.kill_vm(&vm.uuid).await?;
        warn!(vm = %vm.uuid, "Killed VM");

        if !retry::sleep(cancel, self.policies.kill_settle).await {
            return Err(CloudError::Cancelled.into());
        }

        for device in &vm.block_devices {
            self.client.release_block_device(&device.uuid).await?;
            info!(block_device = %device.uuid, "Released block device");
        }
        Ok(())
    }

    async fn release_quietly(&self, block_device: &str) {
        if let Err(e) = self.client.release_block_device(block_device).await {
            error!(block_device, error = %e, "Failed to release block device");
        }
    }
}

#[async_trait]
impl Backend for ShadowBackend {
    fn name(&self) -> &str {
        "shadow"
    }

    async fn create(
        &self,
        cancel: &CancellationToken,
        host: &Host,
        cloud: &Cloud,
    ) -> burster_cloud::Result<()> {
        Ok(self.create_vm(cancel, host, cloud).await?)
    }

    async fn delete(&self, cancel: &CancellationToken, name: &str) -> burster_cloud::Result<()> {
        Ok(self.delete_vm(cancel, name).await?)
    }
}
