//! cloud-burster provisioning
//!
//! This crate turns resolved hosts into provider calls:
//!
//! - [`Backend`]: the create/delete capability every provider implements
//! - [`BackendRegistry`]: maps a cloud type to a backend constructor
//! - [`retry`]: fixed-delay, cancellable polling used by the providers
//! - [`Orchestrator`]: concurrent fan-out over many hostnames with
//!   per-hostname outcomes
//! - [`cloud_init`]: shared helpers for rendering first-boot user data
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            cloud-burster CLI                 │
//! │      (create / delete <hostnames>)           │
//! └─────────────────┬────────────────────────────┘
//!                   │
//! ┌─────────────────▼────────────────────────────┐
//! │               burster-cloud                  │
//! │   Orchestrator ──► BackendRegistry           │
//! │        │              │                      │
//! │        ▼              ▼                      │
//! │   burster-core    trait Backend              │
//! └─────────┬──────────────┬──────────────┬──────┘
//!           │              │              │
//!   ┌───────▼─────┐ ┌──────▼──────┐ ┌─────▼──────┐
//!   │  openstack  │ │  exoscale   │ │   shadow   │
//!   └─────────────┘ └─────────────┘ └────────────┘
//! ```

pub mod backend;
pub mod cloud_init;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod retry;

pub use backend::Backend;
pub use error::{CloudError, Result};
pub use orchestrator::{HostOutcome, Operation, Orchestrator, Report};
pub use registry::BackendRegistry;
pub use retry::{RetryError, RetryPolicy};
pub use tokio_util::sync::CancellationToken;
