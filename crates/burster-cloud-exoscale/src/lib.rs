//! Exoscale backend for cloud-burster
//!
//! Drives the `exo` CLI. Credentials are handed to it through
//! `EXOSCALE_API_KEY` / `EXOSCALE_API_SECRET`; nothing is written to the
//! user's exo configuration.
//!
//! Instances attach to the configured private network and configure their
//! static address from the cloud-config, since Exoscale private networks are
//! unmanaged.

pub mod cloud_config;
pub mod error;
pub mod exo;
pub mod provider;

pub use error::{ExoscaleError, Result};
pub use exo::Exo;
pub use provider::{ExoscaleBackend, ExoscalePolicies};
