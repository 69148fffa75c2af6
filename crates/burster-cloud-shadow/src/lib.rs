//! Shadow backend for cloud-burster
//!
//! Shadow machines are GPU VMs backed by a separately allocated block
//! device. A machine is created in four steps:
//!
//! 1. request a block device in the configured datacenter
//! 2. request a VM attached to it
//! 3. poll the VM list until a public address and SSH port are assigned
//! 4. run the post-provisioning script over SSH as root
//!
//! The VM API has no name field. The hostname is recorded as a marker line
//! in the VM's launch script so later deletes can find it.

pub mod client;
pub mod error;
pub mod models;
pub mod post_script;
pub mod provider;
pub mod ssh;

pub use client::ShadowClient;
pub use error::{Result, ShadowError};
pub use provider::{ShadowBackend, ShadowPolicies};
pub use ssh::Ssh;
