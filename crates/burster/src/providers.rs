//! Wires the provider crates into a [`BackendRegistry`].

use std::sync::Arc;

use burster_cloud::{Backend, BackendRegistry, CloudError};
use burster_cloud_exoscale::ExoscaleBackend;
use burster_cloud_openstack::OpenstackBackend;
use burster_cloud_shadow::ShadowBackend;
use burster_core::{CloudKind, CloudType};

pub fn registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry
        .register(CloudType::Openstack, |cloud| match &cloud.kind {
            CloudKind::Openstack(credentials) => {
                Ok(Arc::new(OpenstackBackend::new(credentials.clone())) as Arc<dyn Backend>)
            }
            _ => Err(CloudError::BackendDispatch(cloud.cloud_type())),
        })
        .register(CloudType::Exoscale, |cloud| match &cloud.kind {
            CloudKind::Exoscale(credentials) => {
                Ok(Arc::new(ExoscaleBackend::new(credentials)) as Arc<dyn Backend>)
            }
            _ => Err(CloudError::BackendDispatch(cloud.cloud_type())),
        })
        .register(CloudType::Shadow, |cloud| match &cloud.kind {
            CloudKind::Shadow(credentials) => {
                Ok(Arc::new(ShadowBackend::new(credentials)) as Arc<dyn Backend>)
            }
            _ => Err(CloudError::BackendDispatch(cloud.cloud_type())),
        });
    registry
}
