//! Exoscale backend error types

use burster_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExoscaleError {
    #[error("exo CLI not found; install it from https://github.com/exoscale/cli")]
    ExoNotFound,

    #[error("exo command failed: {0}")]
    CommandFailed(String),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("host {0} has no IP address")]
    MissingAddress(String),

    #[error("instance {name} is {state}")]
    NotReady { name: String, state: String },

    #[error("instance {0} entered the error state")]
    InstanceFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

impl ExoscaleError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExoscaleError::NotFound { .. })
    }
}

impl From<ExoscaleError> for CloudError {
    fn from(err: ExoscaleError) -> Self {
        match err {
            ExoscaleError::Cloud(inner) => inner,
            other => CloudError::backend("exoscale", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExoscaleError>;
