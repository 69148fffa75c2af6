//! Provisioning error types

use std::fmt::Display;

use burster_core::{BurstError, CloudType};
use thiserror::Error;

use crate::retry::RetryError;

/// Errors surfaced for a single hostname.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error(transparent)]
    Inventory(#[from] BurstError),

    #[error("no backend registered for cloud type '{0}'")]
    BackendDispatch(CloudType),

    #[error("{provider}: {source}")]
    Backend {
        provider: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("gave up after {attempts} attempts: {last_error}")]
    PollExhausted { attempts: u32, last_error: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("cloud-init generation failed: {0}")]
    CloudInit(String),

    #[error("provisioning task terminated without reporting: {0}")]
    TaskAborted(String),
}

impl CloudError {
    /// Wraps a provider-specific error.
    pub fn backend<E>(provider: &'static str, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CloudError::Backend {
            provider,
            source: Box::new(error),
        }
    }
}

impl<E: Display> From<RetryError<E>> for CloudError {
    fn from(err: RetryError<E>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => CloudError::PollExhausted {
                attempts,
                last_error: last.to_string(),
            },
            RetryError::Cancelled => CloudError::Cancelled,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
