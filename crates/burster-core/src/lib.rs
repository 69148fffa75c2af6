//! Core model for cloud-burster.
//!
//! Everything in this crate is pure and synchronous:
//!
//! - [`pattern`]: bracket hostname patterns (`cn[1-3,7]`) expanded into names
//! - [`cidr`]: IPv4 host enumeration used to assign addresses to group hosts
//! - [`model`]: the typed configuration (clouds, networks, hosts, groups)
//! - [`inventory`]: resolving a hostname to its host definition and owning cloud
//! - [`validate`]: structured configuration validation
//! - [`loader`]: reading the YAML configuration from disk

pub mod cidr;
pub mod error;
pub mod inventory;
pub mod loader;
pub mod model;
pub mod pattern;
pub mod validate;

pub use cidr::Ipv4Network;
pub use error::{BurstError, Result};
pub use inventory::Resolved;
pub use loader::{from_yaml_str, load_file};
pub use model::*;
pub use validate::Violation;
