//! OpenStack backend error types

use burster_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenstackError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("no public {service} endpoint for region '{region}' in the service catalog")]
    EndpointNotFound { service: String, region: String },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("host {0} has no IP address")]
    MissingAddress(String),

    #[error("server {name} is {status}")]
    NotReady { name: String, status: String },

    #[error("server {name} failed to build: {fault}")]
    ServerFailed { name: String, fault: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

impl OpenstackError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, OpenstackError::NotFound { .. })
    }
}

impl From<OpenstackError> for CloudError {
    fn from(err: OpenstackError) -> Self {
        match err {
            OpenstackError::Cloud(inner) => inner,
            other => CloudError::backend("openstack", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpenstackError>;
