use std::path::PathBuf;

use thiserror::Error;

use crate::validate::Violation;

#[derive(Error, Debug)]
pub enum BurstError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is accessible by group or others (mode {mode:o}), expected 0600 or stricter")]
    InsecurePermissions { path: PathBuf, mode: u32 },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown cloud type '{0}' (expected one of: openstack, exoscale, shadow)")]
    UnknownCloudType(String),

    #[error("cloud of type '{0}' is missing its '{0}' section")]
    MissingCredentials(String),

    #[error("invalid CIDR '{0}'")]
    InvalidCidr(String),

    #[error(
        "{cidr} cannot address {requested} hosts starting at offset {offset} ({available} usable addresses)"
    )]
    InsufficientAddressSpace {
        cidr: String,
        requested: usize,
        offset: usize,
        available: u64,
    },

    #[error("host not found: {0}")]
    HostNotFound(String),

    #[error("configuration is invalid:\n{}", format_violations(.0))]
    Invalid(Vec<Violation>),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, BurstError>;
