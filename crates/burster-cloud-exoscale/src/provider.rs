//! Exoscale backend implementation

use std::io::Write;

use async_trait::async_trait;
use burster_cloud::retry::{self, RetryError, RetryPolicy};
use burster_cloud::{Backend, CancellationToken, CloudError};
use burster_core::{Cloud, ExoscaleCredentials, Host};
use tracing::{info, instrument, warn};

use crate::cloud_config;
use crate::error::{ExoscaleError, Result};
use crate::exo::{CreateInstance, Exo, Instance};

#[derive(Debug, Clone, Copy)]
pub struct ExoscalePolicies {
    /// Finding the instance before deleting it.
    pub locate: RetryPolicy,
    /// Waiting for a running or stopped state before deleting.
    pub settle: RetryPolicy,
    /// Waiting for a new instance to be running.
    pub ready: RetryPolicy,
}

impl Default for ExoscalePolicies {
    fn default() -> Self {
        Self {
            locate: RetryPolicy::secs(3, 5),
            settle: RetryPolicy::secs(10, 5),
            ready: RetryPolicy::secs(30, 10),
        }
    }
}

pub struct ExoscaleBackend {
    exo: Exo,
    policies: ExoscalePolicies,
}

impl ExoscaleBackend {
    pub fn new(credentials: &ExoscaleCredentials) -> Self {
        Self::with_exo(Exo::new(credentials), ExoscalePolicies::default())
    }

    pub fn with_exo(exo: Exo, policies: ExoscalePolicies) -> Self {
        Self { exo, policies }
    }

    #[instrument(skip_all, fields(host = %host.name, zone = %self.exo.zone()))]
    async fn create_instance(
        &self,
        cancel: &CancellationToken,
        host: &Host,
        cloud: &Cloud,
    ) -> Result<()> {
        let user_data = cloud_config::render(host, cloud)?;
        let (template_id, visibility) = self.exo.find_template(&host.image_name).await?;

        // exo reads user data from a file
        let mut user_data_file = tempfile::NamedTempFile::new()?;
        user_data_file.write_all(user_data.as_bytes())?;
        user_data_file.flush()?;

        let instance = self
            .exo
            .create_instance(&CreateInstance {
                name: &host.name,
                template_id: &template_id,
                template_visibility: visibility,
                instance_type: &host.flavor_name,
                disk_size: host.disk_size,
                private_network: &cloud.network.name,
                cloud_init: user_data_file.path(),
            })
            .await?;
        info!(instance = %instance.id, state = %instance.state, "Spawned instance");

        let instance = if instance.is_running() {
            instance
        } else {
            self.wait_for(cancel, self.policies.ready, &host.name, |i| {
                i.is_running() || i.is_error()
            })
            .await?
        };

        if instance.is_error() {
            return Err(ExoscaleError::InstanceFailed(instance.name));
        }
        info!(instance = %instance.id, "Instance is running");
        Ok(())
    }

    #[instrument(skip_all, fields(host = %name, zone = %self.exo.zone()))]
    async fn delete_instance(&self, cancel: &CancellationToken, name: &str) -> Result<()> {
        warn!("Deleting instance");
        let exo = &self.exo;
        let instance = match retry::attempt(cancel, self.policies.locate, move || {
            exo.show_instance(name)
        })
        .await
        {
            Ok(instance) => instance,
            Err(RetryError::Exhausted { last, .. }) if last.is_not_found() => {
                info!("Instance already absent");
                return Ok(());
            }
            Err(e) => return Err(CloudError::from(e).into()),
        };

        if instance.is_gone() {
            info!(state = %instance.state, "Instance already deleted");
            return Ok(());
        }

        let instance = if instance.is_stable() {
            instance
        } else {
            match self
                .wait_for(cancel, self.policies.settle, name, |i| {
                    i.is_stable() || i.is_gone()
                })
                .await
            {
                Ok(instance) => instance,
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
            }
        };
        if instance.is_gone() {
            return Ok(());
        }

        self.exo.delete_instance(name).await?;
        warn!(instance = %instance.id, "Deleted instance");
        Ok(())
    }

    /// Polls the instance until `done` holds.
    async fn wait_for(
        &self,
        cancel: &CancellationToken,
        policy: RetryPolicy,
        name: &str,
        done: fn(&Instance) -> bool,
    ) -> Result<Instance> {
        let exo = &self.exo;
        let polled = retry::attempt(cancel, policy, move || async move {
            let instance = exo.show_instance(name).await?;
            if done(&instance) {
                Ok(instance)
            } else {
                Err(ExoscaleError::NotReady {
                    name: instance.name,
                    state: instance.state,
                })
            }
        })
        .await;

        match polled {
            Ok(instance) => Ok(instance),
            // vanished while waiting
            Err(RetryError::Exhausted { last, .. }) if last.is_not_found() => Err(last),
            Err(e) => Err(CloudError::from(e).into()),
        }
    }
}

#[async_trait]
impl Backend for ExoscaleBackend {
    fn name(&self) -> &str {
        "exoscale"
    }

    async fn create(
        &self,
        cancel: &CancellationToken,
        host: &Host,
        cloud: &Cloud,
    ) -> burster_cloud::Result<()> {
        Ok(self.create_instance(cancel, host, cloud).await?)
    }

    async fn delete(&self, cancel: &CancellationToken, name: &str) -> burster_cloud::Result<()> {
        Ok(self.delete_instance(cancel, name).await?)
    }
}
