//! Capability contracts consumed by the pipeline.
//!
//! Discovery, enrichment and verification services are external collaborators.
//! The pipeline only depends on the traits in this module, never on a concrete
//! adapter's shape.
//!
//! | Capability | Trait | Called by |
//! |------------|-------|-----------|
//! | Business search | [`SourceAdapter`] | [`DiscoveryAggregator`](crate::DiscoveryAggregator) |
//! | Detail enrichment | [`DetailEnricher`] | [`QualityValidator`](crate::QualityValidator) |
//! | Field verification | [`Verifier`] | [`QualityValidator`](crate::QualityValidator) |
//!
//! # Example
//!
//! ```rust,ignore
//! use prospect_core::{SearchRequest, SourceAdapter, SourceError, SourceId};
//!
//! async fn count(adapter: &dyn SourceAdapter) -> Result<usize, SourceError> {
//!     let request = SearchRequest::new("plumbers", "Austin, TX", 20)?;
//!     let records = adapter.search(request).await?;
//!     Ok(records.len())
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{BusinessRecord, SourceId, ValidationError};

/// Boxed future returned by every capability call.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Field checks performed by the quality validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Phone,
    Website,
    Email,
    Address,
}

impl CheckKind {
    pub const ALL: [Self; 4] = [Self::Phone, Self::Website, Self::Email, Self::Address];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Website => "website",
            Self::Email => "email",
            Self::Address => "address",
        }
    }
}

impl Display for CheckKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "phone" => Ok(Self::Phone),
            "website" => Ok(Self::Website),
            "email" => Ok(Self::Email),
            "address" => Ok(Self::Address),
            other => Err(ValidationError::InvalidCheck {
                value: other.to_owned(),
            }),
        }
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    NotConfigured,
    InvalidRequest,
    Internal,
}

/// Structured error returned by capability calls.
///
/// `NotConfigured` disables a single adapter (missing credentials); every other
/// kind means the source could not be reached and contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotConfigured,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn is_not_configured(&self) -> bool {
        matches!(self.kind, SourceErrorKind::NotConfigured)
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::NotConfigured => "source.not_configured",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for business search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub location: String,
    pub limit: usize,
}

impl SearchRequest {
    pub fn new(
        query: impl Into<String>,
        location: impl Into<String>,
        limit: usize,
    ) -> Result<Self, ValidationError> {
        let query = query.into();
        let location = location.into();
        if query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if location.trim().is_empty() {
            return Err(ValidationError::EmptyLocation);
        }
        if limit == 0 {
            return Err(ValidationError::ZeroLimit);
        }

        Ok(Self {
            query: query.trim().to_owned(),
            location: location.trim().to_owned(),
            limit,
        })
    }
}

/// Identity of a candidate handed to an enricher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessIdentity {
    pub name: String,
    pub address: String,
    pub website: Option<String>,
    pub sources: Vec<SourceId>,
}

impl BusinessIdentity {
    pub fn of(record: &BusinessRecord) -> Self {
        Self {
            name: record.name().to_owned(),
            address: record.address().to_owned(),
            website: record.website().map(str::to_owned),
            sources: record.sources().to_vec(),
        }
    }
}

/// Details returned by an enricher. Absent fields mean "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedDetails {
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub hours: Option<String>,
}

/// Value handed to a verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VerificationSubject {
    Phone(String),
    Website(String),
    /// A concrete mailbox to check for deliverability.
    EmailAddress(String),
    /// A domain for which the verifier may resolve a mailbox.
    EmailDomain(String),
    Address(String),
}

impl VerificationSubject {
    pub const fn check(&self) -> CheckKind {
        match self {
            Self::Phone(_) => CheckKind::Phone,
            Self::Website(_) => CheckKind::Website,
            Self::EmailAddress(_) | Self::EmailDomain(_) => CheckKind::Email,
            Self::Address(_) => CheckKind::Address,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Phone(value)
            | Self::Website(value)
            | Self::EmailAddress(value)
            | Self::EmailDomain(value)
            | Self::Address(value) => value,
        }
    }
}

/// Verdict of an external verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub valid: bool,
    pub detail: String,
    /// Mailbox resolved from a domain lookup, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
}

impl Verdict {
    pub fn valid(detail: impl Into<String>) -> Self {
        Self {
            valid: true,
            detail: detail.into(),
            resolved: None,
        }
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        Self {
            valid: false,
            detail: detail.into(),
            resolved: None,
        }
    }

    pub fn with_resolved(mut self, value: impl Into<String>) -> Self {
        self.resolved = Some(value.into());
        self
    }
}

/// Business search capability.
///
/// Zero matches is `Ok(vec![])`. Connectivity and authentication problems are
/// `Err` so an outage is never mistaken for an empty market.
pub trait SourceAdapter: Send + Sync {
    /// Returns the unique source identifier.
    fn id(&self) -> SourceId;

    /// Searches businesses matching the request.
    ///
    /// Every returned record must carry this adapter's id in `sources`.
    fn search<'a>(&'a self, req: SearchRequest) -> SourceFuture<'a, Vec<BusinessRecord>>;
}

/// Detail lookup for a single, already pre-validated candidate.
pub trait DetailEnricher: Send + Sync {
    fn id(&self) -> SourceId;

    fn enrich<'a>(&'a self, identity: &'a BusinessIdentity) -> SourceFuture<'a, EnrichedDetails>;
}

/// Authoritative check for one field of a candidate.
pub trait Verifier: Send + Sync {
    fn id(&self) -> SourceId;

    fn verify<'a>(&'a self, subject: VerificationSubject) -> SourceFuture<'a, Verdict>;
}
