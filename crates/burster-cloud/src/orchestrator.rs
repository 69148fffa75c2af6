//! Concurrent provisioning across many hostnames
//!
//! Every hostname is resolved against the inventory and paired with the
//! backend of its owning cloud, then runs its create or delete in its own
//! task. Failures are logged as they happen and collected per hostname; one
//! failing host never stops the others.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use burster_core::{Cloud, Config, Host};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::backend::Backend;
use crate::error::{CloudError, Result};
use crate::registry::BackendRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => f.write_str("create"),
            Operation::Delete => f.write_str("delete"),
        }
    }
}

/// Result for one requested hostname.
#[derive(Debug)]
pub struct HostOutcome {
    pub hostname: String,
    /// Owning cloud label, when resolution succeeded.
    pub cloud: Option<String>,
    pub result: Result<()>,
}

impl HostOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregate of a fan-out run, in request order.
#[derive(Debug)]
pub struct Report {
    pub operation: Operation,
    pub outcomes: Vec<HostOutcome>,
    pub duration_ms: u64,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(HostOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &HostOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

pub struct Orchestrator {
    config: Arc<Config>,
    registry: Arc<BackendRegistry>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<BackendRegistry>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            registry,
            cancel,
        }
    }

    pub async fn create(&self, hostnames: Vec<String>) -> Report {
        self.run(Operation::Create, hostnames).await
    }

    pub async fn delete(&self, hostnames: Vec<String>) -> Report {
        self.run(Operation::Delete, hostnames).await
    }

    /// Runs `operation` for every hostname concurrently and waits for all of
    /// them, whatever their outcome.
    ///
    /// Hostnames are resolved up front and each cloud's backend is built at
    /// most once per run, so hosts of the same cloud share one backend.
    pub async fn run(&self, operation: Operation, hostnames: Vec<String>) -> Report {
        let start = Instant::now();
        info!(%operation, hosts = hostnames.len(), "Starting");

        let mut backends = HashMap::new();
        let mut set = JoinSet::new();
        for (index, hostname) in hostnames.iter().cloned().enumerate() {
            let cancel = self.cancel.clone();
            let span = info_span!("host", %operation, hostname = %hostname);
            let (cloud, target) = span.in_scope(|| self.target(&hostname, &mut backends));

            set.spawn(
                async move {
                    let result = match target {
                        Ok(target) => run_one(operation, target, &cancel).await,
                        Err(e) => Err(e),
                    };
                    match &result {
                        Ok(()) => info!(cloud = cloud.as_deref(), "Done"),
                        Err(e) => error!(cloud = cloud.as_deref(), error = %e, "Failed"),
                    }
                    (index, cloud, result)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<(Option<String>, Result<()>)>> =
            hostnames.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, cloud, result)) => slots[index] = Some((cloud, result)),
                Err(e) => error!(error = %e, "Provisioning task did not complete"),
            }
        }

        let outcomes = hostnames
            .into_iter()
            .zip(slots)
            .map(|(hostname, slot)| {
                let (cloud, result) = slot.unwrap_or_else(|| {
                    (
                        None,
                        Err(CloudError::TaskAborted(format!("{operation} {hostname}"))),
                    )
                });
                HostOutcome {
                    hostname,
                    cloud,
                    result,
                }
            })
            .collect();

        let report = Report {
            operation,
            outcomes,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            %operation,
            succeeded = report.succeeded(),
            failed = report.failed(),
            duration_ms = report.duration_ms,
            "Finished"
        );
        report
    }

    /// Resolves `hostname` and picks the backend of its cloud, reusing the
    /// one already built for that cloud in `backends`.
    ///
    /// Returns the cloud label alongside, when resolution succeeded.
    fn target(
        &self,
        hostname: &str,
        backends: &mut HashMap<usize, (Arc<Cloud>, Arc<dyn Backend>)>,
    ) -> (Option<String>, Result<Target>) {
        debug!(state = "resolving", "Resolving host");
        let resolved = match self.config.resolve_with_suffixes(hostname) {
            Ok(resolved) => resolved,
            Err(e) => return (None, Err(e.into())),
        };
        let label = resolved.cloud.label();
        let position = self
            .config
            .clouds
            .iter()
            .position(|cloud| std::ptr::eq(cloud, resolved.cloud));

        let (cloud, backend) = match position.and_then(|i| backends.get(&i)) {
            Some((cloud, backend)) => (Arc::clone(cloud), Arc::clone(backend)),
            None => match self.registry.backend_for(resolved.cloud) {
                Ok(backend) => {
                    let cloud = Arc::new(resolved.cloud.clone());
                    if let Some(i) = position {
                        backends.insert(i, (Arc::clone(&cloud), Arc::clone(&backend)));
                    }
                    (cloud, backend)
                }
                Err(e) => return (Some(label), Err(e)),
            },
        };

        let target = Target {
            label: label.clone(),
            host: resolved.host,
            cloud,
            backend,
        };
        (Some(label), Ok(target))
    }
}

/// A resolved host with the backend serving its cloud.
struct Target {
    label: String,
    host: Host,
    cloud: Arc<Cloud>,
    backend: Arc<dyn Backend>,
}

async fn run_one(operation: Operation, target: Target, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        warn!("Cancelled before dispatch");
        return Err(CloudError::Cancelled);
    }

    let Target {
        label,
        host,
        cloud,
        backend,
    } = target;
    debug!(
        state = "dispatched",
        cloud = %label,
        backend = backend.name(),
        name = %host.name,
        "Dispatching to backend"
    );
    let call = async {
        match operation {
            Operation::Create => backend.create(cancel, &host, &cloud).await,
            Operation::Delete => backend.delete(cancel, &host.name).await,
        }
    };
    tokio::select! {
        _ = cancel.cancelled() => Err(CloudError::Cancelled),
        result = call => result,
    }
}
