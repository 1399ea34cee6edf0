//! Path, command and domain validation

use super::ConfigReport;
use crate::Config;
use std::path::Path;

/// Check filesystem paths and the reload command
pub fn check_paths(config: &Config, report: &mut ConfigReport) {
    let paths: [(&'static str, &Path); 5] = [
        ("sites-dir", config.sites_dir.as_path()),
        ("vhosts-dir", config.vhosts_dir.as_path()),
        ("db-dir", config.db_dir.as_path()),
        ("lets-encrypt-dir", config.lets_encrypt_dir.as_path()),
        ("lets-encrypt-command", config.lets_encrypt_command.as_path()),
    ];

    for (setting, path) in paths {
        if path.as_os_str().is_empty() {
            report.error(setting, "must not be empty");
        }
    }

    if config.sites_dir == config.vhosts_dir && !config.sites_dir.as_os_str().is_empty() {
        report.error(
            "vhosts-dir",
            format!("must differ from sites-dir (both {:?})", config.sites_dir),
        );
    }

    if config
        .nginx_reload_command
        .first()
        .map_or(true, |program| program.is_empty())
    {
        report.error("nginx-reload-command", "must name a program");
    }
}

/// Check the apex domain and reserved sub-domain names
pub fn check_domains(config: &Config, report: &mut ConfigReport) {
    if config.apex_domain.is_empty() {
        report.error("apex-domain", "must not be empty");
    }

    for name in &config.reserved_subdomains {
        if name.is_empty() || name.contains('.') || name.to_lowercase() != *name {
            report.error(
                "reserved-subdomains",
                format!("'{}' must be a single lowercase label", name),
            );
        }
    }
}
