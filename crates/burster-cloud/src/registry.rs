//! Backend selection by cloud type

use std::collections::HashMap;
use std::sync::Arc;

use burster_core::{Cloud, CloudType};
use tracing::debug;

use crate::backend::Backend;
use crate::error::{CloudError, Result};

type Constructor = Box<dyn Fn(&Cloud) -> Result<Arc<dyn Backend>> + Send + Sync>;

/// Maps each [`CloudType`] to a function building its backend.
///
/// Provider crates are wired in by the binary, so this crate never depends
/// on a concrete provider.
#[derive(Default)]
pub struct BackendRegistry {
    constructors: HashMap<CloudType, Constructor>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the constructor for `cloud_type`.
    pub fn register<F>(&mut self, cloud_type: CloudType, constructor: F) -> &mut Self
    where
        F: Fn(&Cloud) -> Result<Arc<dyn Backend>> + Send + Sync + 'static,
    {
        self.constructors.insert(cloud_type, Box::new(constructor));
        self
    }

    pub fn supports(&self, cloud_type: CloudType) -> bool {
        self.constructors.contains_key(&cloud_type)
    }

    /// Builds the backend serving `cloud`.
    pub fn backend_for(&self, cloud: &Cloud) -> Result<Arc<dyn Backend>> {
        let cloud_type = cloud.cloud_type();
        let constructor = self
            .constructors
            .get(&cloud_type)
            .ok_or(CloudError::BackendDispatch(cloud_type))?;
        debug!(cloud = %cloud.label(), "Building backend");
        constructor(cloud)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use burster_core::{CloudKind, Host, Network, PostScripts, ShadowCredentials};
    use tokio_util::sync::CancellationToken;

    struct Named(&'static str);

    #[async_trait]
    impl Backend for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn create(&self, _: &CancellationToken, _: &Host, _: &Cloud) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _: &CancellationToken, _: &str) -> Result<()> {
            Ok(())
        }
    }

    fn shadow_cloud() -> Cloud {
        Cloud {
            authorized_keys: vec![],
            post_scripts: PostScripts::default(),
            network: Network::default(),
            groups_host: vec![],
            hosts: vec![],
            custom_config: None,
            kind: CloudKind::Shadow(ShadowCredentials::default()),
        }
    }

    #[test]
    fn test_backend_for_registered_type() {
        let mut registry = BackendRegistry::new();
        registry.register(CloudType::Shadow, |_| Ok(Arc::new(Named("shadow"))));

        assert!(registry.supports(CloudType::Shadow));
        let backend = registry.backend_for(&shadow_cloud()).unwrap();
        assert_eq!(backend.name(), "shadow");
    }

    #[test]
    fn test_backend_for_unregistered_type() {
        let mut registry = BackendRegistry::new();
        registry.register(CloudType::Openstack, |_| Ok(Arc::new(Named("openstack"))));

        match registry.backend_for(&shadow_cloud()) {
            Err(CloudError::BackendDispatch(CloudType::Shadow)) => {}
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("shadow should not be served"),
        }
    }

    #[test]
    fn test_constructor_error_is_propagated() {
        let mut registry = BackendRegistry::new();
        registry.register(CloudType::Shadow, |_| {
            Err(CloudError::CloudInit("bad key".to_string()))
        });

        assert!(matches!(
            registry.backend_for(&shadow_cloud()),
            Err(CloudError::CloudInit(_))
        ));
    }
}
