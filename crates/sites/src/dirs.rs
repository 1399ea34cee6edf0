//! Per-site directory provisioning
//!
//! Every site owns two directory trees:
//!
//! ```text
//! sites/
//! └── alice.static.land/     # Site content (also the ACME webroot)
//! vhosts/
//! ├── alice.static.land.conf # Written by the vhost configurator
//! └── alice.static.land/     # Extra nginx snippets included by the vhost
//! ```

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while provisioning site directories
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Invalid domain for directory name: '{0}'")]
    InvalidDomain(String),

    #[error("Failed to create directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove directory {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Creates and destroys the on-disk trees backing a site.
#[async_trait]
pub trait SiteDirectories: Send + Sync {
    /// Create the content and vhost-snippet directories. Idempotent.
    async fn create(&self, domain: &str) -> Result<(), ProvisionError>;

    /// Remove both directories. Missing directories are not an error.
    async fn destroy(&self, domain: &str) -> Result<(), ProvisionError>;
}

/// Filesystem-backed [`SiteDirectories`].
#[derive(Debug, Clone)]
pub struct FsSiteDirectories {
    sites_dir: PathBuf,
    vhosts_dir: PathBuf,
}

impl FsSiteDirectories {
    pub fn new(sites_dir: impl Into<PathBuf>, vhosts_dir: impl Into<PathBuf>) -> Self {
        Self {
            sites_dir: sites_dir.into(),
            vhosts_dir: vhosts_dir.into(),
        }
    }

    /// Content directory for a domain
    pub fn site_path(&self, domain: &str) -> Result<PathBuf, ProvisionError> {
        Ok(self.sites_dir.join(checked_domain(domain)?))
    }

    /// Vhost snippet directory for a domain
    pub fn vhost_path(&self, domain: &str) -> Result<PathBuf, ProvisionError> {
        Ok(self.vhosts_dir.join(checked_domain(domain)?))
    }
}

/// Reject anything that would escape the configured roots.
fn checked_domain(domain: &str) -> Result<&str, ProvisionError> {
    let valid = !domain.is_empty()
        && domain != "."
        && !domain.contains("..")
        && !domain.contains(['/', '\\', '\0']);
    if valid {
        Ok(domain)
    } else {
        Err(ProvisionError::InvalidDomain(domain.to_string()))
    }
}

async fn create_dir(path: &Path) -> Result<(), ProvisionError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| ProvisionError::Create {
            path: path.to_path_buf(),
            source,
        })
}

async fn remove_dir(path: &Path) -> Result<(), ProvisionError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Directory to remove not found");
            Ok(())
        }
        Err(source) => Err(ProvisionError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[async_trait]
impl SiteDirectories for FsSiteDirectories {
    async fn create(&self, domain: &str) -> Result<(), ProvisionError> {
        let site_path = self.site_path(domain)?;
        let vhost_path = self.vhost_path(domain)?;

        create_dir(&site_path).await?;
        create_dir(&vhost_path).await?;

        info!(
            domain = %domain,
            site_path = %site_path.display(),
            vhost_path = %vhost_path.display(),
            "Created site directories"
        );
        Ok(())
    }

    async fn destroy(&self, domain: &str) -> Result<(), ProvisionError> {
        let site_path = self.site_path(domain)?;
        let vhost_path = self.vhost_path(domain)?;

        remove_dir(&site_path).await?;
        remove_dir(&vhost_path).await?;

        debug!(domain = %domain, "Removed site directories");
        Ok(())
    }
}
