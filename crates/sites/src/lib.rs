//! Static Land Sites Library
//!
//! Lifecycle management for sites hosted on a shared static-site platform.
//!
//! A site goes live in a fixed order: its directories are created, a
//! certificate is requested from Let's Encrypt, an nginx vhost is written
//! and nginx reloaded, and only then is the site record saved. The
//! [`SiteRegistry`] sequences those steps over four collaborators, each
//! behind a trait so they can be swapped out:
//!
//! - [`SiteDirectories`] - content and vhost-snippet directories
//! - [`CertificateIssuer`] - the certbot client
//! - [`VhostConfigurator`] - nginx vhost files and reloads
//! - [`Store`] - site records
//!
//! # Example
//!
//! ```ignore
//! use staticland_config::Config;
//! use staticland_sites::{RegisterRequest, SiteRegistry};
//!
//! let config = Config::from_file("/etc/staticland.toml")?;
//! let registry = SiteRegistry::from_config(&config)?;
//!
//! let site = registry
//!     .register(RegisterRequest {
//!         domain: "alice.static.land".into(),
//!         owners: vec!["alice".into()],
//!     })
//!     .await?;
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod cert;
pub mod dirs;
pub mod error;
pub mod registry;
pub mod site;
pub mod store;
pub mod vhost;

// ============================================================================
// Public API Re-exports
// ============================================================================

// Lifecycle
pub use registry::{
    OwnerRequest, RedirectRequest, RegisterRequest, RegistrySettings, SiteRegistry,
};

// Records
pub use site::{is_reserved_subdomain, Site};
pub use store::{JsonFileStore, MemoryStore, Record, Store, StoreError};

// Collaborators
pub use cert::{CertError, CertRequest, Certbot, CertificateIssuer, CommandOutput};
pub use dirs::{FsSiteDirectories, ProvisionError, SiteDirectories};
pub use vhost::{NginxVhosts, RedirectVhost, Reloader, SslVhost, VhostConfigurator, VhostError};

// Errors
pub use error::{SiteError, SiteResult};
