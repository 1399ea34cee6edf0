//! Static Land configuration
//!
//! Configuration for the site manager is read once at startup and handed to
//! the site registry and its collaborators. Every field has a default, so an
//! empty file (or no file at all) yields a working development setup rooted
//! under `/home/staticland`.
//!
//! # Example
//!
//! ```toml
//! apex-domain = "static.land"
//! reserved-subdomains = ["www", "api"]
//! request-certs = true
//! reload-nginx = true
//! lets-encrypt-email = "ops@static.land"
//! sites-dir = "/srv/staticland/sites"
//! vhosts-dir = "/srv/staticland/vhosts"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

pub mod validate;

pub use validate::{ConfigReport, Finding, Severity};

/// Environment variable consulted for the configuration file path
pub const CONFIG_ENV_VAR: &str = "STATICLAND_CONFIG";

// ============================================================================
// Config
// ============================================================================

/// Site manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Verbose logging
    #[serde(default)]
    pub debug: bool,

    /// Shared apex domain that user sub-domains hang off (`<name>.<apex>`)
    #[serde(default = "default_apex_domain")]
    pub apex_domain: String,

    /// Sub-domain names of the apex that cannot be registered
    #[serde(default)]
    pub reserved_subdomains: Vec<String>,

    /// Run the CA client when registering sites
    #[serde(default = "default_true")]
    pub request_certs: bool,

    /// Reload nginx after writing vhost files
    #[serde(default = "default_true")]
    pub reload_nginx: bool,

    /// Path to the certbot binary
    #[serde(default = "default_lets_encrypt_command")]
    pub lets_encrypt_command: PathBuf,

    /// Root directory for certbot state (`config/`, `work/`, `logs/`)
    #[serde(default = "default_lets_encrypt_dir")]
    pub lets_encrypt_dir: PathBuf,

    /// Contact email for the ACME account
    #[serde(default)]
    pub lets_encrypt_email: Option<String>,

    /// Use the Let's Encrypt staging environment
    #[serde(default)]
    pub lets_encrypt_staging: bool,

    /// Root of the per-site content directories
    #[serde(default = "default_sites_dir")]
    pub sites_dir: PathBuf,

    /// Directory nginx includes vhost files from
    #[serde(default = "default_vhosts_dir")]
    pub vhosts_dir: PathBuf,

    /// Directory holding the site records
    #[serde(default = "default_db_dir")]
    pub db_dir: PathBuf,

    /// Command (program followed by arguments) that reloads nginx
    #[serde(default = "default_nginx_reload_command")]
    pub nginx_reload_command: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_apex_domain() -> String {
    "static.land".to_string()
}

fn default_lets_encrypt_command() -> PathBuf {
    PathBuf::from("/home/staticland/certbot-auto")
}

fn default_lets_encrypt_dir() -> PathBuf {
    PathBuf::from("/home/staticland/letsencrypt")
}

fn default_sites_dir() -> PathBuf {
    PathBuf::from("/home/staticland/sites")
}

fn default_vhosts_dir() -> PathBuf {
    PathBuf::from("/home/staticland/vhosts")
}

fn default_db_dir() -> PathBuf {
    PathBuf::from("/home/staticland/db")
}

fn default_nginx_reload_command() -> Vec<String> {
    vec!["nginx".to_string(), "-s".to_string(), "reload".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            apex_domain: default_apex_domain(),
            reserved_subdomains: Vec::new(),
            request_certs: default_true(),
            reload_nginx: default_true(),
            lets_encrypt_command: default_lets_encrypt_command(),
            lets_encrypt_dir: default_lets_encrypt_dir(),
            lets_encrypt_email: None,
            lets_encrypt_staging: false,
            sites_dir: default_sites_dir(),
            vhosts_dir: default_vhosts_dir(),
            db_dir: default_db_dir(),
            nginx_reload_command: default_nginx_reload_command(),
        }
    }
}

// ============================================================================
// Config Implementation
// ============================================================================

impl Config {
    /// Load configuration from a file
    ///
    /// The format is picked from the extension: `.json` is parsed as JSON,
    /// anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        debug!(path = %path.display(), "Loading configuration");

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }

    /// Parse configuration from TOML
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).context("Failed to parse TOML configuration")?;
        trace!(?config, "Parsed TOML configuration");
        Ok(config)
    }

    /// Parse configuration from JSON
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(content).context("Failed to parse JSON configuration")?;
        trace!(?config, "Parsed JSON configuration");
        Ok(config)
    }

    /// Resolve the configuration: explicit path, then `STATICLAND_CONFIG`,
    /// then built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(path),
            None => {
                debug!("No configuration file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Directory certbot keeps issued certificates in (`--config-dir`)
    pub fn certs_dir(&self) -> PathBuf {
        self.lets_encrypt_dir.join("config")
    }

    /// Validate the configuration, failing on the first batch of errors
    pub fn validate(&self) -> Result<ConfigReport> {
        let report = validate::validate_config(self);
        if !report.is_valid() {
            let messages: Vec<String> = report.errors().map(ToString::to_string).collect();
            anyhow::bail!("Invalid configuration:\n  {}", messages.join("\n  "));
        }
        Ok(report)
    }
}
