//! Configuration validation
//!
//! Structural checks (paths, apex, reserved names) produce errors; settings
//! that are legal but unusual in production produce warnings. Every finding
//! names the configuration key it is about.

pub mod lint;
pub mod paths;

use std::fmt;

use crate::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The registry cannot run with this setting
    Error,
    /// Works, but probably not what a live host wants
    Warning,
}

/// One observation about a configuration key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    /// Kebab-case key as written in the configuration file
    pub setting: &'static str,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.setting, self.message)
    }
}

/// Findings collected over every check
#[derive(Debug, Clone, Default)]
pub struct ConfigReport {
    findings: Vec<Finding>,
}

impl ConfigReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, setting: &'static str, message: impl Into<String>) {
        self.push(Severity::Error, setting, message.into());
    }

    pub fn warn(&mut self, setting: &'static str, message: impl Into<String>) {
        self.push(Severity::Warning, setting, message.into());
    }

    fn push(&mut self, severity: Severity, setting: &'static str, message: String) {
        self.findings.push(Finding {
            severity,
            setting,
            message,
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.with_severity(Severity::Warning)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    /// No errors were found; warnings are allowed
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Whether any finding concerns `setting`
    pub fn mentions(&self, setting: &str) -> bool {
        self.findings.iter().any(|f| f.setting == setting)
    }
}

/// Run every check against a configuration
pub fn validate_config(config: &Config) -> ConfigReport {
    let mut report = ConfigReport::new();
    paths::check_paths(config, &mut report);
    paths::check_domains(config, &mut report);
    lint::lint_config(config, &mut report);
    report
}
