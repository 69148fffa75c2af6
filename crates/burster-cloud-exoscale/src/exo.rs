//! exo CLI wrapper

use std::path::Path;
use std::process::Stdio;

use burster_core::ExoscaleCredentials;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::{ExoscaleError, Result};

/// Template visibilities searched, in order: account-private first.
pub const TEMPLATE_VISIBILITIES: [&str; 2] = ["private", "public"];

pub struct Exo {
    program: String,
    zone: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub ip_address: Option<String>,
}

impl Instance {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    pub fn is_error(&self) -> bool {
        self.state == "error"
    }

    /// Safe to destroy: not booting, stopping or migrating.
    pub fn is_stable(&self) -> bool {
        matches!(self.state.as_str(), "running" | "stopped" | "error")
    }

    /// Already destroyed or being destroyed.
    pub fn is_gone(&self) -> bool {
        matches!(self.state.as_str(), "destroyed" | "destroying" | "expunging")
    }
}

/// Arguments of `exo compute instance create`.
#[derive(Debug, Clone)]
pub struct CreateInstance<'a> {
    pub name: &'a str,
    pub template_id: &'a str,
    pub template_visibility: &'a str,
    pub instance_type: &'a str,
    pub disk_size: u32,
    pub private_network: &'a str,
    pub cloud_init: &'a Path,
}

impl Exo {
    pub fn new(credentials: &ExoscaleCredentials) -> Self {
        Self {
            program: "exo".to_string(),
            zone: credentials.zone.clone(),
            api_key: credentials.api_key.clone(),
            api_secret: credentials.api_secret.clone(),
        }
    }

    /// Uses another executable in place of `exo`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Run an exo command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd.arg("--zone").arg(&self.zone);
        cmd.arg("--output-format").arg("json");
        cmd.env("EXOSCALE_API_KEY", &self.api_key);
        cmd.env("EXOSCALE_API_SECRET", &self.api_secret);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {} --zone {}", self.program, args.join(" "), self.zone);

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExoscaleError::ExoNotFound
            } else {
                ExoscaleError::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ExoscaleError::CommandFailed(stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    pub async fn list_templates(&self, visibility: &str) -> Result<Vec<Template>> {
        let output = self
            .run_command(&[
                "compute",
                "instance-template",
                "list",
                "--visibility",
                visibility,
            ])
            .await?;

        if output.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&output)?)
    }

    /// Finds a template by name, returning its ID and visibility.
    pub async fn find_template(&self, name: &str) -> Result<(String, &'static str)> {
        for visibility in TEMPLATE_VISIBILITIES {
            let templates = self.list_templates(visibility).await?;
            if let Some(t) = templates.into_iter().find(|t| t.name == name) {
                tracing::debug!(template = %t.id, visibility, "Found template");
                return Ok((t.id, visibility));
            }
        }
        Err(ExoscaleError::NotFound {
            kind: "template",
            name: name.to_string(),
        })
    }

    pub async fn create_instance(&self, request: &CreateInstance<'_>) -> Result<Instance> {
        let disk_size = request.disk_size.to_string();
        let cloud_init = request.cloud_init.to_string_lossy();
        let args = [
            "compute",
            "instance",
            "create",
            request.name,
            "--template",
            request.template_id,
            "--template-visibility",
            request.template_visibility,
            "--instance-type",
            request.instance_type,
            "--disk-size",
            disk_size.as_str(),
            "--private-network",
            request.private_network,
            "--cloud-init",
            cloud_init.as_ref(),
        ];

        let output = self.run_command(&args).await?;
        Ok(serde_json::from_str(&output)?)
    }

    /// Shows an instance by name, mapping a missing instance to
    /// [`ExoscaleError::NotFound`].
    pub async fn show_instance(&self, name: &str) -> Result<Instance> {
        match self.run_command(&["compute", "instance", "show", name]).await {
            Ok(output) => Ok(serde_json::from_str(&output)?),
            Err(ExoscaleError::CommandFailed(stderr)) if is_not_found(&stderr) => {
                Err(ExoscaleError::NotFound {
                    kind: "instance",
                    name: name.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Deletes an instance; an instance that is already gone is not an error.
    pub async fn delete_instance(&self, name: &str) -> Result<()> {
        match self
            .run_command(&["compute", "instance", "delete", name, "--force"])
            .await
        {
            Ok(_) => Ok(()),
            Err(ExoscaleError::CommandFailed(stderr)) if is_not_found(&stderr) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn is_not_found(stderr: &str) -> bool {
    stderr.to_lowercase().contains("not found")
}
