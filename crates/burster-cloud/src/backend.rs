//! Backend capability

use async_trait::async_trait;
use burster_core::{Cloud, Host};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Creates and deletes machines on one provider.
///
/// Implementations must stop waiting and return [`crate::CloudError::Cancelled`]
/// once `cancel` fires. `delete` must succeed when the machine is already gone.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Provider name used in logs (e.g. "openstack").
    fn name(&self) -> &str;

    /// Provisions `host` and waits until the provider reports it ready.
    async fn create(&self, cancel: &CancellationToken, host: &Host, cloud: &Cloud) -> Result<()>;

    /// Destroys the machine named `name` and the resources attached to it.
    async fn delete(&self, cancel: &CancellationToken, name: &str) -> Result<()>;
}
