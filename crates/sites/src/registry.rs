//! Site registry: the site lifecycle.
//!
//! # Registration
//!
//! 1. Validate the request and reject reserved sub-domains of the apex
//! 2. Look up an existing record; if there is none, create the directories
//! 3. Request a certificate (always, also when re-registering)
//! 4. Write the TLS vhost and reload nginx
//! 5. Save the record
//!
//! Each step runs only if the previous one succeeded, and the record is
//! written last, so a stored record means provisioning went through at least
//! once. Nothing is rolled back on failure: every step tolerates repetition,
//! so the recovery path is to register again.
//!
//! # Removal
//!
//! The record is deleted before the directories. A failure in between leaves
//! an orphaned directory, never a record pointing at missing content.
//!
//! There is no locking between the lookup and the save; concurrent calls for
//! the same domain must be serialized by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::{Validate, ValidationError};

use staticland_config::Config;

use crate::cert::{CertRequest, Certbot, CertificateIssuer};
use crate::dirs::{FsSiteDirectories, SiteDirectories};
use crate::error::{SiteError, SiteResult};
use crate::site::{
    is_reserved_subdomain, is_valid_hostname, normalize_hostname, Site, DOMAIN_INDEX,
    OWNERS_INDEX,
};
use crate::store::{JsonFileStore, Record, Store};
use crate::vhost::{NginxVhosts, RedirectVhost, SslVhost, VhostConfigurator};

// Empty values are left to the `length` rule so a missing field reports
// only "property required".
fn hostname(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || is_valid_hostname(value) {
        Ok(())
    } else {
        Err(ValidationError::new("hostname"))
    }
}

fn no_blank_owners(owners: &[String]) -> Result<(), ValidationError> {
    if owners.iter().any(|o| o.trim().is_empty()) {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

/// Register a new site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, message = "domain property required"),
        custom(function = "hostname")
    )]
    pub domain: String,
    #[validate(
        length(min = 1, message = "owners property required"),
        custom(function = "no_blank_owners")
    )]
    pub owners: Vec<String>,
}

/// Add or remove one owner of a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct OwnerRequest {
    #[validate(
        length(min = 1, message = "domain property required"),
        custom(function = "hostname")
    )]
    pub domain: String,
    #[validate(length(min = 1, message = "owner property required"))]
    pub owner: String,
}

/// Point an extra name at a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RedirectRequest {
    /// Target site
    #[validate(
        length(min = 1, message = "domain property required"),
        custom(function = "hostname")
    )]
    pub domain: String,
    /// Name to redirect from
    #[validate(
        length(min = 1, message = "redirect property required"),
        custom(function = "hostname")
    )]
    pub redirect: String,
}

/// Settings the registry reads from configuration at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    pub apex_domain: String,
    pub reserved_subdomains: Vec<String>,
    pub reload_nginx: bool,
    pub sites_dir: PathBuf,
    pub certs_dir: PathBuf,
}

impl From<&Config> for RegistrySettings {
    fn from(config: &Config) -> Self {
        Self {
            apex_domain: config.apex_domain.clone(),
            reserved_subdomains: config.reserved_subdomains.clone(),
            reload_nginx: config.reload_nginx,
            sites_dir: config.sites_dir.clone(),
            certs_dir: config.certs_dir(),
        }
    }
}

/// Owns the lifecycle of site records and the resources behind them.
pub struct SiteRegistry {
    settings: RegistrySettings,
    store: Arc<dyn Store<Site>>,
    dirs: Arc<dyn SiteDirectories>,
    certs: Arc<dyn CertificateIssuer>,
    vhosts: Arc<dyn VhostConfigurator>,
}

impl SiteRegistry {
    pub fn new(
        settings: RegistrySettings,
        store: Arc<dyn Store<Site>>,
        dirs: Arc<dyn SiteDirectories>,
        certs: Arc<dyn CertificateIssuer>,
        vhosts: Arc<dyn VhostConfigurator>,
    ) -> Self {
        debug!(
            apex_domain = %settings.apex_domain,
            reserved = settings.reserved_subdomains.len(),
            reload_nginx = settings.reload_nginx,
            "Creating site registry"
        );
        Self {
            settings,
            store,
            dirs,
            certs,
            vhosts,
        }
    }

    /// Build a registry with the filesystem store and the real collaborators.
    pub fn from_config(config: &Config) -> SiteResult<Self> {
        let store = JsonFileStore::<Site>::new(&config.db_dir)?;
        Ok(Self::new(
            RegistrySettings::from(config),
            Arc::new(store),
            Arc::new(FsSiteDirectories::new(
                config.sites_dir.clone(),
                config.vhosts_dir.clone(),
            )),
            Arc::new(Certbot::new(config)),
            Arc::new(NginxVhosts::from_config(config)),
        ))
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Current time as recorded on site records
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Register a site, provisioning everything it needs.
    pub async fn register(&self, request: RegisterRequest) -> SiteResult<Site> {
        request.validate()?;
        let RegisterRequest { domain, owners } = request;
        let domain = normalize_hostname(&domain);

        if is_reserved_subdomain(
            &domain,
            &self.settings.apex_domain,
            &self.settings.reserved_subdomains,
        ) {
            info!(domain = %domain, "Rejected reserved subdomain");
            return Err(SiteError::SubdomainUnavailable(domain));
        }

        let existing = match self.find_by_domain(&domain).await {
            Ok(site) => Some(site),
            Err(_) => {
                debug!(domain = %domain, "Creating site");
                None
            }
        };

        if existing.is_none() {
            self.dirs.create(&domain).await?;
        } else {
            debug!(domain = %domain, "Site exists, keeping its directories");
        }

        let cert_request = CertRequest {
            domain: domain.clone(),
            sites_dir: self.settings.sites_dir.clone(),
            certs_dir: self.settings.certs_dir.clone(),
            reload_nginx: self.settings.reload_nginx,
        };
        if let Err(e) = self.certs.create(&cert_request).await {
            let output = e.output().cloned().unwrap_or_default();
            warn!(
                domain = %domain,
                error = %e,
                stdout = %output.stdout,
                stderr = %output.stderr,
                "Certificate request failed"
            );
            return Err(SiteError::Certificate);
        }

        self.vhosts
            .ssl(&SslVhost {
                domain: domain.clone(),
                sites_dir: self.settings.sites_dir.clone(),
                certs_dir: self.settings.certs_dir.clone(),
                reload_nginx: self.settings.reload_nginx,
            })
            .await?;

        let site = self
            .store
            .save(Site::new(domain, owners, self.timestamp()))
            .await?;

        info!(
            domain = %site.domain(),
            owners = ?site.owners,
            reregistered = existing.is_some(),
            "Site registered"
        );
        Ok(site)
    }

    /// Remove a site's record, then its directories.
    pub async fn destroy(&self, domain: &str) -> SiteResult<()> {
        let site = self.find_by_domain(domain).await?;

        self.store.delete(site.key()).await?;
        debug!(domain = %domain, "Deleted site record");

        self.dirs.destroy(site.domain()).await?;

        info!(domain = %domain, "Site destroyed");
        Ok(())
    }

    /// Look up a site by domain.
    ///
    /// Any store failure is reported as `NotFound`.
    pub async fn find_by_domain(&self, domain: &str) -> SiteResult<Site> {
        self.store
            .find_one(DOMAIN_INDEX, &normalize_hostname(domain))
            .await
            .map_err(|e| {
                debug!(domain = %domain, error = %e, "Site lookup failed");
                SiteError::NotFound(domain.to_string())
            })
    }

    /// All sites listing `owner` among their owners, ordered by domain.
    pub async fn sites_for_owner(&self, owner: &str) -> SiteResult<Vec<Site>> {
        Ok(self.store.find(OWNERS_INDEX, owner).await?)
    }

    /// Append an owner. Duplicates are not rejected.
    pub async fn add_owner(&self, request: OwnerRequest) -> SiteResult<Site> {
        request.validate()?;

        let mut site = self.find_by_domain(&request.domain).await?;
        site.add_owner(request.owner.clone());
        let site = self.store.update(site).await?;

        info!(domain = %request.domain, owner = %request.owner, "Added site owner");
        Ok(site)
    }

    /// Remove the first matching owner. Removing a non-member still saves
    /// the (unchanged) record.
    pub async fn remove_owner(&self, request: OwnerRequest) -> SiteResult<Site> {
        request.validate()?;

        let mut site = self.find_by_domain(&request.domain).await?;
        let removed = site.remove_owner(&request.owner);
        let site = self.store.update(site).await?;

        info!(
            domain = %request.domain,
            owner = %request.owner,
            removed,
            "Removed site owner"
        );
        Ok(site)
    }

    /// Write a redirect vhost from `request.redirect` to `request.domain`,
    /// replacing any vhost already using that name.
    pub async fn redirect(&self, request: RedirectRequest) -> SiteResult<()> {
        request.validate()?;
        let domain = normalize_hostname(&request.domain);
        let redirect = normalize_hostname(&request.redirect);

        if self.vhosts.exists(&redirect).await? {
            debug!(redirect = %redirect, "Replacing existing vhost");
            self.vhosts.remove(&redirect).await?;
        }

        self.vhosts
            .redirect(&RedirectVhost {
                domain,
                redirect,
                reload_nginx: self.settings.reload_nginx,
            })
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for SiteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteRegistry")
            .field("settings", &self.settings)
            .finish()
    }
}
