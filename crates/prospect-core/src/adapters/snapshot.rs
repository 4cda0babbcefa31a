//! File-backed discovery source.
//!
//! A snapshot is a JSON document holding recorded search results for one or
//! more sources plus recorded verifier verdicts:
//!
//! ```json
//! {
//!   "sources": [
//!     {
//!       "source": "google_places",
//!       "location": "Austin, TX",
//!       "records": [
//!         { "name": "Acme Plumbing Co", "address": "412 Birch Ave, Austin, TX 78745",
//!           "phone": "(512) 555-1234", "website": "https://acmeplumbing.com" }
//!       ]
//!     }
//!   ],
//!   "verdicts": [
//!     { "check": "website", "subject": "https://acmeplumbing.com", "valid": true,
//!       "detail": "reachable (HTTP 200)" }
//!   ]
//! }
//! ```
//!
//! The first batch is meant to be registered as the primary source.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data_source::{CheckKind, SearchRequest, SourceAdapter, SourceError, SourceFuture};
use crate::verifiers::{RecordedVerdict, RecordedVerifier};
use crate::{BusinessRecord, CoreError, SourceId, ValidationError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub sources: Vec<SnapshotBatch>,
    #[serde(default)]
    pub verdicts: Vec<RecordedVerdict>,
}

impl Snapshot {
    pub fn from_json_str(input: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// One adapter per batch, in document order.
    pub fn adapters(&self) -> Vec<SnapshotSource> {
        self.sources.iter().cloned().map(SnapshotSource::new).collect()
    }

    /// Checks with at least one recorded verdict.
    pub fn recorded_checks(&self) -> Vec<CheckKind> {
        CheckKind::ALL
            .into_iter()
            .filter(|check| self.verdicts.iter().any(|verdict| verdict.check == *check))
            .collect()
    }

    pub fn verifier(&self) -> RecordedVerifier {
        RecordedVerifier::new(self.verdicts.clone())
    }
}

/// Recorded results of one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBatch {
    pub source: SourceId,
    /// When set, only requests for this query match (case-insensitive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// When set, only requests for this location match (case-insensitive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Simulates an outage: every search fails with this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
    #[serde(default)]
    pub records: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Provider price level, e.g. Google Places `0..=4`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_tier: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl SnapshotEntry {
    pub fn to_record(&self, source: &SourceId) -> Result<BusinessRecord, ValidationError> {
        let mut record = BusinessRecord::new(source.clone(), &self.name, &self.address)?;
        if let Some(phone) = &self.phone {
            record = record.with_phone(phone);
        }
        if let Some(website) = &self.website {
            record = record.with_website(website);
        }
        if let Some(email) = &self.email {
            record = record.with_email(email);
        }
        if let Some(rating) = self.rating {
            record = record.with_rating(rating)?;
        }
        if let Some(tier) = self.price_tier {
            record = record.with_price_tier(tier);
        }
        if let Some(category) = &self.category {
            record = record.with_category(category);
        }
        Ok(record)
    }
}

/// Discovery source replaying a [`SnapshotBatch`].
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    batch: SnapshotBatch,
}

impl SnapshotSource {
    pub fn new(batch: SnapshotBatch) -> Self {
        Self { batch }
    }

    fn matches(&self, req: &SearchRequest) -> bool {
        let query_matches = self
            .batch
            .query
            .as_deref()
            .map_or(true, |query| query.trim().eq_ignore_ascii_case(&req.query));
        let location_matches = self
            .batch
            .location
            .as_deref()
            .map_or(true, |location| location.trim().eq_ignore_ascii_case(&req.location));
        query_matches && location_matches
    }
}

impl SourceAdapter for SnapshotSource {
    fn id(&self) -> SourceId {
        self.batch.source.clone()
    }

    fn search<'a>(&'a self, req: SearchRequest) -> SourceFuture<'a, Vec<BusinessRecord>> {
        Box::pin(async move {
            if let Some(message) = &self.batch.unavailable {
                return Err(SourceError::unavailable(message.clone()));
            }
            if !self.matches(&req) {
                return Ok(Vec::new());
            }

            self.batch
                .records
                .iter()
                .take(req.limit)
                .map(|entry| {
                    entry.to_record(&self.batch.source).map_err(|error| {
                        SourceError::internal(format!(
                            "snapshot record '{}' is invalid: {error}",
                            entry.name
                        ))
                    })
                })
                .collect()
        })
    }
}
