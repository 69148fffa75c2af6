//! Configuration model.
//!
//! The YAML document is deserialized into [`ConfigFile`] and then converted
//! into [`Config`], where each cloud carries exactly one provider section.

mod cloud;
mod config;
mod host;
mod network;

pub use cloud::*;
pub use config::*;
pub use host::*;
pub use network::*;
