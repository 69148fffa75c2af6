//! OpenStack backend implementation

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use burster_cloud::retry::{self, RetryPolicy};
use burster_cloud::{Backend, CancellationToken, CloudError};
use burster_core::{Cloud, Host, OpenstackCredentials};
use tracing::{error, info, instrument, warn};

use crate::client::OpenstackClient;
use crate::cloud_config;
use crate::error::{OpenstackError, Result};
use crate::models::{BlockDeviceMapping, CreateServer, Server, ServerNetwork};

/// Polling budgets for each wait of the create and delete flows.
#[derive(Debug, Clone, Copy)]
pub struct OpenstackPolicies {
    /// Finding the server by name before deleting it.
    pub locate_server: RetryPolicy,
    /// Waiting for a pending task to finish before deleting.
    pub settle: RetryPolicy,
    /// Finding the server's port before deleting it.
    pub locate_port: RetryPolicy,
    /// Waiting for a new server to become ACTIVE.
    pub ready: RetryPolicy,
}

impl Default for OpenstackPolicies {
    fn default() -> Self {
        Self {
            locate_server: RetryPolicy::secs(3, 5),
            settle: RetryPolicy::secs(10, 5),
            locate_port: RetryPolicy::secs(10, 5),
            ready: RetryPolicy::secs(60, 10),
        }
    }
}

pub struct OpenstackBackend {
    client: OpenstackClient,
    policies: OpenstackPolicies,
}

impl OpenstackBackend {
    pub fn new(credentials: OpenstackCredentials) -> Self {
        Self::with_policies(credentials, OpenstackPolicies::default())
    }

    pub fn with_policies(credentials: OpenstackCredentials, policies: OpenstackPolicies) -> Self {
        Self {
            client: OpenstackClient::new(credentials),
            policies,
        }
    }

    pub fn client(&self) -> &OpenstackClient {
        &self.client
    }

    #[instrument(skip_all, fields(host = %host.name))]
    async fn create_server(
        &self,
        cancel: &CancellationToken,
        host: &Host,
        cloud: &Cloud,
    ) -> Result<()> {
        let ip = host
            .ip
            .as_deref()
            .ok_or_else(|| OpenstackError::MissingAddress(host.name.clone()))?;

        let image_id = self.client.find_image_id(&host.image_name).await?;
        let flavor_id = self.client.find_flavor_id(&host.flavor_name).await?;
        let network_id = self.client.find_network_id(&cloud.network.name).await?;
        let subnet_id = self
            .client
            .find_subnet_id(&network_id, &cloud.network.subnet_cidr)
            .await?;
        let user_data = cloud_config::render(host, cloud)?;

        let port_id = self.client.create_port(&network_id, &subnet_id, ip).await?;

        let request = CreateServer {
            name: host.name.clone(),
            image_ref: image_id.clone(),
            flavor_ref: flavor_id,
            user_data: STANDARD.encode(user_data),
            config_drive: true,
            networks: vec![ServerNetwork {
                port: port_id.clone(),
            }],
            block_device_mapping_v2: vec![
                BlockDeviceMapping::image_root(&image_id),
                BlockDeviceMapping::blank_volume(host.disk_size),
            ],
        };

        let server_id = match self.client.create_server(request).await {
            Ok(id) => id,
            Err(e) => {
                if let Err(cleanup) = self.client.delete_port(&port_id).await {
                    error!(port = %port_id, error = %cleanup, "Failed to delete port");
                }
                return Err(e);
            }
        };
        info!(server = %server_id, ip, "Spawned server");

        let client = &self.client;
        let id = server_id.as_str();
        let server = retry::attempt(cancel, self.policies.ready, move || async move {
            let server = client.get_server(id).await?;
            if server.is_active() || server.is_error() {
                Ok(server)
            } else {
                Err(OpenstackError::NotReady {
                    name: server.name,
                    status: server.status,
                })
            }
        })
        .await
        .map_err(CloudError::from)?;

        if server.is_error() {
            return Err(OpenstackError::ServerFailed {
                fault: server.fault_message(),
                name: server.name,
            });
        }
        info!(server = %server_id, "Server is active");
        Ok(())
    }

    #[instrument(skip_all, fields(host = %name))]
    async fn delete_server(&self, cancel: &CancellationToken, name: &str) -> Result<()> {
        warn!("Deleting server");
        let client = &self.client;
        let server = match retry::attempt(cancel, self.policies.locate_server, move || {
            client.find_server(name)
        })
        .await
        {
            Ok(server) => server,
            Err(retry::RetryError::Exhausted { last, .. }) if last.is_not_found() => {
                info!("Server already absent");
                return Ok(());
            }
            Err(e) => return Err(CloudError::from(e).into()),
        };

        let Some(server) = self.wait_settled(cancel, server).await? else {
            info!("Server vanished while waiting");
            return Ok(());
        };
        if server.is_gone() {
            info!(status = %server.status, "Server already deleted");
            return Ok(());
        }

        let device_id = server.id.as_str();
        match retry::attempt(cancel, self.policies.locate_port, move || {
            client.find_port_by_device(device_id)
        })
        .await
        {
            Ok(port_id) => self.client.delete_port(&port_id).await?,
            Err(retry::RetryError::Cancelled) => return Err(CloudError::Cancelled.into()),
            Err(e) => warn!(server = %server.id, error = %e, "No port found for server"),
        }

        self.client.delete_server(&server.id).await?;
        warn!(server = %server.id, "Deleted server");
        Ok(())
    }

    /// Waits until Nova has no task in progress on the server.
    ///
    /// Returns `None` once the server no longer exists.
    async fn wait_settled(
        &self,
        cancel: &CancellationToken,
        server: Server,
    ) -> Result<Option<Server>> {
        if server.is_settled() {
            return Ok(Some(server));
        }
        let client = &self.client;
        let server_id = server.id.as_str();
        let settled = retry::attempt(cancel, self.policies.settle, move || async move {
            let server = match client.get_server(server_id).await {
                Ok(server) => server,
                Err(e) if e.is_not_found() => return Ok(None),
                Err(e) => return Err(e),
            };
            if server.is_settled() {
                Ok(Some(server))
            } else {
                Err(OpenstackError::NotReady {
                    status: format!(
                        "{} ({})",
                        server.status,
                        server.task_state.as_deref().unwrap_or("no task")
                    ),
                    name: server.name,
                })
            }
        })
        .await
        .map_err(CloudError::from)?;
        Ok(settled)
    }
}

#[async_trait]
impl Backend for OpenstackBackend {
    fn name(&self) -> &str {
        "openstack"
    }

    async fn create(
        &self,
        cancel: &CancellationToken,
        host: &Host,
        cloud: &Cloud,
    ) -> burster_cloud::Result<()> {
        Ok(self.create_server(cancel, host, cloud).await?)
    }

    async fn delete(&self, cancel: &CancellationToken, name: &str) -> burster_cloud::Result<()> {
        Ok(self.delete_server(cancel, name).await?)
    }
}
