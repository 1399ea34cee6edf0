//! Frontend reload.
//!
//! nginx picks up new vhost files only after a reload; the reload command is
//! configurable so hosts running nginx under systemd can use
//! `systemctl reload nginx` instead of signalling the master directly.

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use super::VhostError;

/// Runs the configured reload command
#[derive(Debug, Clone)]
pub struct Reloader {
    command: Vec<String>,
}

impl Reloader {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// Run the reload command to completion
    pub async fn reload(&self) -> Result<(), VhostError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| VhostError::Reload("no reload command configured".to_string()))?;

        debug!(command = %self.command.join(" "), "Reloading nginx");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| VhostError::Reload(format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VhostError::Reload(format!(
                "{} exited with status {:?}: {}",
                program,
                output.status.code(),
                stderr.trim()
            )));
        }

        info!("nginx reloaded");
        Ok(())
    }
}
