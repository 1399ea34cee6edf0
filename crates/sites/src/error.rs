//! Site lifecycle errors.

use thiserror::Error;

use crate::dirs::ProvisionError;
use crate::store::StoreError;
use crate::vhost::VhostError;

/// Result type for site registry operations.
pub type SiteResult<T> = Result<T, SiteError>;

/// Errors returned by [`SiteRegistry`](crate::SiteRegistry) operations.
///
/// Every variant is returned before any later lifecycle step runs; nothing
/// already done is undone.
#[derive(Debug, Error)]
pub enum SiteError {
    /// Missing, empty or malformed request field. Nothing was touched.
    #[error("{0}")]
    Validation(String),

    /// The domain is a reserved sub-domain of the apex. Nothing was touched.
    #[error("subdomain {0} not available")]
    SubdomainUnavailable(String),

    /// Site directories could not be created or removed
    #[error(transparent)]
    Provisioning(#[from] ProvisionError),

    /// The certificate client failed; its output is logged, not returned
    #[error("Unable to request certificate from Let's Encrypt")]
    Certificate,

    /// The vhost could not be written or nginx could not be reloaded
    #[error(transparent)]
    Vhost(#[from] VhostError),

    /// No site is registered for the domain
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record store failed
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl SiteError {
    /// Whether re-running the same operation unchanged may succeed.
    ///
    /// Directory creation, certificate issuance and vhost writes all tolerate
    /// repetition, so their failures can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SiteError::Provisioning(_) | SiteError::Certificate | SiteError::Vhost(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SiteError::NotFound(_))
    }
}

impl From<validator::ValidationErrors> for SiteError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => match &*e.code {
                        "hostname" => format!("{} must be a valid host name", field),
                        "blank" => format!("{} must not contain blank entries", field),
                        _ => format!("{} property required", field),
                    },
                })
            })
            .collect();
        messages.sort();
        SiteError::Validation(messages.join(", "))
    }
}
