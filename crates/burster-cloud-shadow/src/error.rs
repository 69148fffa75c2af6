//! Shadow backend error types

use burster_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShadowError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("VM {0} has no public address yet")]
    NotReady(String),

    #[error("ssh not found in PATH")]
    SshNotFound,

    #[error("post-script failed ({status}): {output}")]
    PostScript { status: String, output: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

impl ShadowError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ShadowError::NotFound { .. })
    }
}

impl From<ShadowError> for CloudError {
    fn from(err: ShadowError) -> Self {
        match err {
            ShadowError::Cloud(inner) => inner,
            other => CloudError::backend("shadow", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShadowError>;
