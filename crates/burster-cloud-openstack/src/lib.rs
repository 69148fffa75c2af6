//! OpenStack backend for cloud-burster
//!
//! Talks to Keystone v3, Nova and Neutron over their REST APIs.
//!
//! # Create
//!
//! 1. Look up image, flavor, network and subnet by name
//! 2. Create a port with the host's fixed IP and port security disabled
//! 3. Boot the server from the image with a blank data volume of `diskSize`
//!    GB, a config drive and the rendered cloud-config as user data
//! 4. Wait for the server to become `ACTIVE`
//!
//! The port is removed again if the server cannot be created.
//!
//! # Delete
//!
//! The server is located by name (absent means already deleted), allowed to
//! settle, its port removed, then the server itself is deleted.

pub mod client;
pub mod cloud_config;
pub mod error;
pub mod models;
pub mod provider;

pub use client::OpenstackClient;
pub use error::{OpenstackError, Result};
pub use provider::{OpenstackBackend, OpenstackPolicies};
