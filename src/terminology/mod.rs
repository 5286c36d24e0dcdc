//! Terminology membership services for required binding validation.
//!
//! The binding validator asks exactly one question of a terminology service:
//! is this code (optionally qualified by a code system) a member of this
//! value set? A service answers with a [`MembershipOutcome`]:
//!
//! - `Member` / `NotMember` - a definitive answer
//! - `Unknown(..)` - the backing data cannot answer because the value set or
//!   the code system is not loaded
//!
//! `Unknown` is an ordinary outcome, not an error. Only genuine service
//! faults (connectivity, timeouts, internal failures) are reported through
//! [`TerminologyError`], and those are escalated by the classifier.
//!
//! # Example
//!
//! ```ignore
//! use octofhir_conformance::terminology::{CachedTerminologyService, InMemoryTerminologyService};
//! use std::sync::Arc;
//!
//! let mut service = InMemoryTerminologyService::new();
//! service.add_code("http://hl7.org/fhir/ValueSet/observation-status", "final", None);
//!
//! let cached = CachedTerminologyService::new(Arc::new(service), Default::default());
//! let outcome = cached
//!     .check_membership("final", None, "http://hl7.org/fhir/ValueSet/observation-status")
//!     .await?;
//! ```

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

mod cache;
mod in_memory;

pub use cache::{CacheStats, CachedTerminologyService, TerminologyCacheConfig};
pub use in_memory::InMemoryTerminologyService;

/// Error codes for terminology service faults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminologyErrorCode {
    /// TS1001: Terminology service unavailable
    ServiceUnavailable = 1001,
    /// TS1002: Terminology call exceeded its timeout
    Timeout = 1002,
    /// TS1003: Internal service failure
    Internal = 1003,
}

impl std::fmt::Display for TerminologyErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TS{:04}", *self as u32)
    }
}

/// Faults raised by a terminology service.
///
/// Incomplete terminology data is not a fault; see [`UnknownTerminology`].
#[derive(Debug, Clone, Error)]
pub enum TerminologyError {
    /// Service is unavailable
    #[error("Terminology service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// Membership check did not complete in time
    #[error("Terminology check against '{value_set}' timed out after {elapsed:?}")]
    Timeout { value_set: String, elapsed: Duration },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TerminologyError {
    /// Get the error code for this error
    pub fn code(&self) -> TerminologyErrorCode {
        match self {
            TerminologyError::ServiceUnavailable { .. } => TerminologyErrorCode::ServiceUnavailable,
            TerminologyError::Timeout { .. } => TerminologyErrorCode::Timeout,
            TerminologyError::Internal(_) => TerminologyErrorCode::Internal,
        }
    }
}

/// Result type for terminology operations
pub type TerminologyResult<T> = Result<T, TerminologyError>;

/// The terminology data needed to answer a membership question is missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnknownTerminology {
    ValueSet { url: String, message: String },
    CodeSystem { url: String, message: String },
}

impl UnknownTerminology {
    pub fn value_set(url: impl Into<String>) -> Self {
        let url = url.into();
        let message = format!("Unknown ValueSet: {url}");
        UnknownTerminology::ValueSet { url, message }
    }

    pub fn code_system(url: impl Into<String>) -> Self {
        let url = url.into();
        let message = format!("Unknown CodeSystem: {url}");
        UnknownTerminology::CodeSystem { url, message }
    }

    /// Human-readable description supplied by the service.
    pub fn message(&self) -> &str {
        match self {
            UnknownTerminology::ValueSet { message, .. }
            | UnknownTerminology::CodeSystem { message, .. } => message,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            UnknownTerminology::ValueSet { url, .. } | UnknownTerminology::CodeSystem { url, .. } => {
                url
            }
        }
    }
}

/// Outcome of one value set membership check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MembershipOutcome {
    Member,
    NotMember,
    Unknown(UnknownTerminology),
}

impl MembershipOutcome {
    pub fn is_member(&self) -> bool {
        matches!(self, MembershipOutcome::Member)
    }
}

/// Trait for terminology membership services.
///
/// Implementations can be backed by local datasets or a remote FHIR
/// terminology server. The trait is async to support network-based services.
///
/// # Example Implementation
///
/// ```ignore
/// struct RemoteTerminologyService {
///     client: reqwest::Client,
///     base_url: String,
/// }
///
/// #[async_trait]
/// impl TerminologyService for RemoteTerminologyService {
///     async fn check_membership(
///         &self,
///         code: &str,
///         system: Option<&str>,
///         value_set_url: &str,
///     ) -> TerminologyResult<MembershipOutcome> {
///         // Call ValueSet/$validate-code and map the Parameters response
///         Ok(MembershipOutcome::Member)
///     }
/// }
/// ```
#[async_trait]
pub trait TerminologyService: Send + Sync {
    /// Check whether `code` is a member of the value set at `value_set_url`.
    ///
    /// # Arguments
    ///
    /// * `code` - The code value to check
    /// * `system` - Code system URL, when the coded value carries one
    /// * `value_set_url` - Canonical URL of the value set, without version
    async fn check_membership(
        &self,
        code: &str,
        system: Option<&str>,
        value_set_url: &str,
    ) -> TerminologyResult<MembershipOutcome>;
}
