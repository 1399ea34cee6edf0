//! Certificate issuance through certbot
//!
//! Certificates are obtained by running the certbot client in webroot mode
//! against the site's content directory. The client keeps its own state
//! under the configured Let's Encrypt directory:
//!
//! ```text
//! letsencrypt/
//! ├── config/   # --config-dir, certificates end up in live/<domain>/
//! ├── work/     # --work-dir
//! └── logs/     # --logs-dir
//! ```

use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use staticland_config::Config;

/// Captured output of an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl From<&std::process::Output> for CommandOutput {
    fn from(output: &std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Errors from the certificate client
///
/// The captured output can contain account details, so `Display` never
/// includes it; use [`CertError::output`] to log it.
#[derive(Debug, Error)]
pub enum CertError {
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Certificate client exited with status {status:?}")]
    Failed {
        status: Option<i32>,
        output: CommandOutput,
    },
}

impl CertError {
    /// Raw process output, if the client ran
    pub fn output(&self) -> Option<&CommandOutput> {
        match self {
            CertError::Failed { output, .. } => Some(output),
            CertError::Spawn { .. } => None,
        }
    }
}

/// A certificate request for one domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertRequest {
    pub domain: String,
    /// Root of the site content directories (webroot parent)
    pub sites_dir: PathBuf,
    /// certbot `--config-dir`
    pub certs_dir: PathBuf,
    /// Reload nginx when certbot later renews this certificate
    pub reload_nginx: bool,
}

/// Obtains TLS certificates for domains.
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn create(&self, request: &CertRequest) -> Result<CommandOutput, CertError>;
}

/// [`CertificateIssuer`] backed by the certbot CLI
#[derive(Debug, Clone)]
pub struct Certbot {
    command: PathBuf,
    lets_encrypt_dir: PathBuf,
    email: Option<String>,
    staging: bool,
    enabled: bool,
    reload_command: Vec<String>,
}

impl Certbot {
    pub fn new(config: &Config) -> Self {
        Self {
            command: config.lets_encrypt_command.clone(),
            lets_encrypt_dir: config.lets_encrypt_dir.clone(),
            email: config.lets_encrypt_email.clone(),
            staging: config.lets_encrypt_staging,
            enabled: config.request_certs,
            reload_command: config.nginx_reload_command.clone(),
        }
    }

    /// Arguments passed to certbot for `request`
    pub fn args(&self, request: &CertRequest) -> Vec<OsString> {
        let webroot = request.sites_dir.join(&request.domain);
        let mut args: Vec<OsString> = vec![
            "certonly".into(),
            "--non-interactive".into(),
            "--agree-tos".into(),
            "--webroot".into(),
            "-w".into(),
            webroot.into(),
            "-d".into(),
            request.domain.clone().into(),
            "--config-dir".into(),
            request.certs_dir.clone().into(),
            "--work-dir".into(),
            self.lets_encrypt_dir.join("work").into(),
            "--logs-dir".into(),
            self.lets_encrypt_dir.join("logs").into(),
        ];

        match &self.email {
            Some(email) => {
                args.push("--email".into());
                args.push(email.into());
            }
            None => args.push("--register-unsafely-without-email".into()),
        }

        if self.staging {
            args.push("--staging".into());
        }

        if request.reload_nginx && !self.reload_command.is_empty() {
            args.push("--deploy-hook".into());
            args.push(self.reload_command.join(" ").into());
        }

        args
    }
}

#[async_trait]
impl CertificateIssuer for Certbot {
    async fn create(&self, request: &CertRequest) -> Result<CommandOutput, CertError> {
        if !self.enabled {
            info!(
                domain = %request.domain,
                "Certificate requests disabled, skipping certbot"
            );
            return Ok(CommandOutput::default());
        }

        debug!(
            domain = %request.domain,
            command = %self.command.display(),
            "Requesting certificate"
        );

        let output = Command::new(&self.command)
            .args(self.args(request))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| CertError::Spawn {
                command: self.command.display().to_string(),
                source,
            })?;

        let captured = CommandOutput::from(&output);
        if !output.status.success() {
            return Err(CertError::Failed {
                status: output.status.code(),
                output: captured,
            });
        }

        info!(domain = %request.domain, "Certificate issued");
        Ok(captured)
    }
}
