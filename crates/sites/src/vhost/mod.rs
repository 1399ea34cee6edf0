//! nginx vhost configuration
//!
//! Each served name gets one file, `<vhosts-dir>/<name>.conf`, which nginx
//! includes from its main configuration. Two flavours are written:
//!
//! - **TLS site** ([`SslVhost`]) - serves the site's content directory over
//!   HTTPS with its Let's Encrypt certificate
//! - **Redirect** ([`RedirectVhost`]) - answers for an extra name and sends
//!   clients to the target site
//!
//! Writing a file replaces whatever was there before, so activation can be
//! repeated safely.

mod reload;
mod template;

pub use reload::Reloader;
pub use template::{render_redirect, render_ssl};

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use staticland_config::Config;

/// Errors from vhost writing and reloading
#[derive(Debug, Error)]
pub enum VhostError {
    #[error("Invalid vhost name: '{0}'")]
    InvalidName(String),

    #[error("Failed to write vhost {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove vhost {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("nginx reload failed: {0}")]
    Reload(String),
}

/// TLS site activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SslVhost {
    pub domain: String,
    pub sites_dir: PathBuf,
    pub certs_dir: PathBuf,
    pub reload_nginx: bool,
}

/// Redirect from `redirect` to `domain`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectVhost {
    /// Target site
    pub domain: String,
    /// Name being redirected; also the vhost file name
    pub redirect: String,
    pub reload_nginx: bool,
}

/// Writes and removes vhost files and reloads the frontend.
#[async_trait]
pub trait VhostConfigurator: Send + Sync {
    /// Write the TLS site vhost for `vhost.domain`.
    async fn ssl(&self, vhost: &SslVhost) -> Result<(), VhostError>;

    /// Write a redirect vhost named after `vhost.redirect`.
    async fn redirect(&self, vhost: &RedirectVhost) -> Result<(), VhostError>;

    /// Whether a vhost file exists for `name`.
    async fn exists(&self, name: &str) -> Result<bool, VhostError>;

    /// Remove the vhost file for `name`.
    async fn remove(&self, name: &str) -> Result<(), VhostError>;
}

/// Filesystem [`VhostConfigurator`] for nginx
#[derive(Debug, Clone)]
pub struct NginxVhosts {
    vhosts_dir: PathBuf,
    reloader: Reloader,
}

impl NginxVhosts {
    pub fn new(vhosts_dir: impl Into<PathBuf>, reloader: Reloader) -> Self {
        Self {
            vhosts_dir: vhosts_dir.into(),
            reloader,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.vhosts_dir.clone(),
            Reloader::new(config.nginx_reload_command.clone()),
        )
    }

    /// Path of the vhost file for `name`
    pub fn vhost_path(&self, name: &str) -> Result<PathBuf, VhostError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(VhostError::InvalidName(name.to_string()));
        }
        Ok(self.vhosts_dir.join(format!("{}.conf", name)))
    }

    async fn write(&self, name: &str, content: String) -> Result<PathBuf, VhostError> {
        let path = self.vhost_path(name)?;
        tokio::fs::create_dir_all(&self.vhosts_dir).await?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| VhostError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

#[async_trait]
impl VhostConfigurator for NginxVhosts {
    async fn ssl(&self, vhost: &SslVhost) -> Result<(), VhostError> {
        let content = render_ssl(
            &vhost.domain,
            &vhost.sites_dir,
            &vhost.certs_dir,
            &self.vhosts_dir,
        );
        let path = self.write(&vhost.domain, content).await?;
        info!(domain = %vhost.domain, path = %path.display(), "Wrote TLS vhost");

        if vhost.reload_nginx {
            self.reloader.reload().await?;
        }
        Ok(())
    }

    async fn redirect(&self, vhost: &RedirectVhost) -> Result<(), VhostError> {
        let content = render_redirect(&vhost.redirect, &vhost.domain);
        let path = self.write(&vhost.redirect, content).await?;
        info!(
            redirect = %vhost.redirect,
            domain = %vhost.domain,
            path = %path.display(),
            "Wrote redirect vhost"
        );

        if vhost.reload_nginx {
            self.reloader.reload().await?;
        }
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, VhostError> {
        let path = self.vhost_path(name)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn remove(&self, name: &str) -> Result<(), VhostError> {
        let path = self.vhost_path(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|source| VhostError::Remove {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "Removed vhost");
        Ok(())
    }
}
