use std::collections::HashMap;
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cost::CostTracker;
use crate::data_source::{SearchRequest, SourceAdapter, SourceError};
use crate::source_policy::Metered;
use crate::{BusinessRecord, CoreError, SourceId};

/// Position of an adapter in the merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRole {
    Primary,
    Supplemental,
}

/// What happened to one adapter during a discovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOutcome {
    Succeeded,
    Unavailable,
    NotConfigured,
    /// The budget refused the call, so the adapter was never invoked.
    SkippedBudget,
}

impl SourceOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Unavailable => "unavailable",
            Self::NotConfigured => "not_configured",
            Self::SkippedBudget => "skipped_budget",
        }
    }

    pub const fn is_degraded(self) -> bool {
        !matches!(self, Self::Succeeded)
    }
}

/// Per-source line of the discovery statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: SourceId,
    pub role: SourceRole,
    pub outcome: SourceOutcome,
    /// Records the source returned, before dedupe.
    pub records: usize,
    #[serde(skip)]
    pub error: Option<SourceError>,
}

/// Merged, deduplicated candidate set of one discovery pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    pub records: Vec<BusinessRecord>,
    pub sources: Vec<SourceReport>,
    /// Unique records before truncation to the requested limit.
    pub found: usize,
    pub duplicates_removed: usize,
    pub latency_ms: u64,
}

impl Discovery {
    pub fn degraded_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources
            .iter()
            .filter(|report| report.outcome.is_degraded())
    }
}

/// Fans a search out to the primary and supplemental adapters and merges the
/// results.
pub struct DiscoveryAggregator {
    primary: Metered<dyn SourceAdapter>,
    supplemental: Vec<Metered<dyn SourceAdapter>>,
}

impl DiscoveryAggregator {
    pub fn new(primary: Metered<dyn SourceAdapter>) -> Self {
        Self {
            primary,
            supplemental: Vec::new(),
        }
    }

    pub fn with_supplemental(mut self, adapter: Metered<dyn SourceAdapter>) -> Self {
        self.supplemental.push(adapter);
        self
    }

    /// Registered adapters in merge order, primary first.
    pub fn source_ids(&self) -> Vec<SourceId> {
        self.adapters().map(|(adapter, _)| adapter.id().clone()).collect()
    }

    pub async fn discover(
        &self,
        query: &str,
        location: &str,
        limit: usize,
        tracker: &CostTracker,
    ) -> Result<Discovery, CoreError> {
        let started = Instant::now();
        let request = SearchRequest::new(query, location, limit)?;

        let mut reports = Vec::with_capacity(1 + self.supplemental.len());
        let mut dispatched = Vec::new();
        for (adapter, role) in self.adapters() {
            match adapter.reserve(tracker) {
                Ok(()) => dispatched.push((adapter, role)),
                Err(exhausted) => {
                    warn!(source = %adapter.id(), %exhausted, "discovery call skipped");
                    reports.push(SourceReport {
                        source: adapter.id().clone(),
                        role,
                        outcome: SourceOutcome::SkippedBudget,
                        records: 0,
                        error: None,
                    });
                }
            }
        }

        let results = join_all(dispatched.iter().map(|(adapter, _)| {
            let request = request.clone();
            async move { adapter.throttled().await.search(request).await }
        }))
        .await;

        let mut batches = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for ((adapter, role), result) in dispatched.iter().zip(results) {
            let source = adapter.id().clone();
            match result {
                Ok(records) => {
                    debug!(%source, records = records.len(), "source returned");
                    reports.push(SourceReport {
                        source,
                        role: *role,
                        outcome: SourceOutcome::Succeeded,
                        records: records.len(),
                        error: None,
                    });
                    batches.push((*role, records));
                }
                Err(error) => {
                    let outcome = if error.is_not_configured() {
                        SourceOutcome::NotConfigured
                    } else {
                        SourceOutcome::Unavailable
                    };
                    warn!(
                        %source,
                        code = error.code(),
                        error = error.message(),
                        "discovery source degraded"
                    );
                    errors.push(error.clone());
                    reports.push(SourceReport {
                        source,
                        role: *role,
                        outcome,
                        records: 0,
                        error: Some(error),
                    });
                }
            }
        }

        if !dispatched.is_empty() && batches.is_empty() {
            if errors.iter().all(SourceError::is_not_configured) {
                return Err(CoreError::Configuration(String::from(
                    "no discovery source is configured",
                )));
            }
            return Err(CoreError::AllSourcesUnavailable {
                attempted: dispatched.len(),
                errors,
            });
        }

        reports.sort_by_key(|report| self.position(&report.source));

        let (mut records, duplicates_removed) = merge_batches(batches);
        let found = records.len();
        records.truncate(request.limit);

        info!(
            found,
            duplicates_removed,
            returned = records.len(),
            degraded = reports.iter().filter(|r| r.outcome.is_degraded()).count(),
            "discovery complete"
        );

        Ok(Discovery {
            records,
            sources: reports,
            found,
            duplicates_removed,
            latency_ms: elapsed_ms(started),
        })
    }

    fn adapters(&self) -> impl Iterator<Item = (&Metered<dyn SourceAdapter>, SourceRole)> {
        std::iter::once((&self.primary, SourceRole::Primary)).chain(
            self.supplemental
                .iter()
                .map(|adapter| (adapter, SourceRole::Supplemental)),
        )
    }

    fn position(&self, source: &SourceId) -> usize {
        self.adapters()
            .position(|(adapter, _)| adapter.id() == source)
            .unwrap_or(usize::MAX)
    }
}

impl std::fmt::Debug for DiscoveryAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryAggregator")
            .field("sources", &self.source_ids())
            .finish()
    }
}

/// Merges batches in source order. Primary records are all kept; a
/// supplemental record whose dedupe key is already present is folded into the
/// surviving record.
fn merge_batches(batches: Vec<(SourceRole, Vec<BusinessRecord>)>) -> (Vec<BusinessRecord>, usize) {
    let mut merged: Vec<BusinessRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut duplicates = 0;

    for (role, records) in batches {
        for record in records {
            let key = record.dedupe_key();
            match (role, index.get(&key)) {
                (SourceRole::Supplemental, Some(&survivor)) => {
                    let filled = merged[survivor].absorb(record);
                    debug!(
                        name = merged[survivor].name(),
                        filled = filled.len(),
                        "duplicate merged"
                    );
                    duplicates += 1;
                }
                _ => {
                    index.entry(key).or_insert(merged.len());
                    merged.push(record);
                }
            }
        }
    }

    (merged, duplicates)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
