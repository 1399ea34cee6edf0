//! Configuration linting for production settings
//!
//! Nothing here is an error; these are settings that are fine for local
//! development but usually a mistake on a live host.

use super::ConfigReport;
use crate::Config;

/// Warn about settings that look like a development setup
pub fn lint_config(config: &Config, report: &mut ConfigReport) {
    if !config.request_certs {
        report.warn(
            "request-certs",
            "disabled; registered sites will not get certificates",
        );
    }

    if config.request_certs && config.lets_encrypt_email.is_none() {
        report.warn(
            "lets-encrypt-email",
            "not set; expiry notices will not be delivered",
        );
    }

    if config.lets_encrypt_staging {
        report.warn(
            "lets-encrypt-staging",
            "enabled; issued certificates are not trusted by browsers",
        );
    }

    if !config.reload_nginx {
        report.warn("reload-nginx", "disabled; vhost changes need a manual reload");
    }

    if config.reserved_subdomains.is_empty() {
        report.warn(
            "reserved-subdomains",
            format!("empty; any name under {} can be claimed", config.apex_domain),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_settings_warn() {
        let config = Config {
            request_certs: false,
            reload_nginx: false,
            ..Default::default()
        };
        let mut report = ConfigReport::new();
        lint_config(&config, &mut report);

        assert!(report.is_valid());
        assert!(report.mentions("request-certs"));
        assert!(report.mentions("reload-nginx"));
    }

    #[test]
    fn test_production_settings_are_quiet() {
        let config = Config {
            lets_encrypt_email: Some("ops@static.land".to_string()),
            reserved_subdomains: vec!["www".to_string()],
            ..Default::default()
        };
        let mut report = ConfigReport::new();
        lint_config(&config, &mut report);
        assert_eq!(report.warnings().count(), 0);
    }
}
