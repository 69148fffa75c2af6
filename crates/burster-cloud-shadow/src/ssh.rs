//! Remote script execution through the OpenSSH client

use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Result, ShadowError};

pub struct Ssh {
    program: String,
    user: String,
    connect_timeout: Duration,
}

impl Default for Ssh {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            user: "root".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl Ssh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses another executable in place of `ssh`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Pipes `script` to `bash -s -- <args>` on the remote host and returns
    /// the combined output.
    ///
    /// `private_key` is the PEM text of the key; it lives in a 0600 temp
    /// file for the duration of the call. Host keys are not checked since
    /// every VM is new.
    pub async fn run_script(
        &self,
        private_key: &str,
        address: &str,
        port: u16,
        script: &str,
        args: &[&str],
    ) -> Result<String> {
        let mut key_file = tempfile::NamedTempFile::new()?;
        key_file.write_all(private_key.as_bytes())?;
        if !private_key.ends_with('\n') {
            key_file.write_all(b"\n")?;
        }
        key_file.flush()?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("-i").arg(key_file.path());
        cmd.arg("-p").arg(port.to_string());
        cmd.args(["-o", "StrictHostKeyChecking=no"]);
        cmd.args(["-o", "UserKnownHostsFile=/dev/null"]);
        cmd.args(["-o", "IdentitiesOnly=yes"]);
        cmd.args(["-o", "BatchMode=yes"]);
        cmd.arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs()));
        cmd.arg(format!("{}@{}", self.user, address));
        cmd.args(["bash", "-s", "--"]);
        cmd.args(args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}@{} -p {}", self.program, self.user, address, port);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShadowError::SshNotFound
            } else {
                ShadowError::Io(e)
            }
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(ShadowError::PostScript {
                status: output.status.to_string(),
                output: combined,
            });
        }
        Ok(combined)
    }
}
