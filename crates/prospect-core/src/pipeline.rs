//! Stage orchestration.
//!
//! ```text
//! discover ─▶ score ─▶ validate (waves) ─▶ export gate ─▶ PipelineReport
//!    │                    │
//!    └──── CostTracker ───┘   one per run
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::aggregator::{DiscoveryAggregator, SourceOutcome};
use crate::config::PipelineConfig;
use crate::cost::CostTracker;
use crate::data_source::{CheckKind, DetailEnricher, SearchRequest, SourceAdapter, Verifier};
use crate::gate::ExportGate;
use crate::report::{
    budget_warnings, PipelineReport, PipelineStats, ReportMeta, Stage, StageError,
    ValidationTally,
};
use crate::scoring::PreValidationScorer;
use crate::source_policy::{Metered, SourcePolicies};
use crate::throttling::Throttle;
use crate::validator::QualityValidator;
use crate::{Budget, CoreError, SourceId, ValidationError};

/// One discovery run: what to look for and how much may be spent.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryRequest {
    pub query: String,
    pub location: String,
    pub limit: usize,
    pub budget: Budget,
}

impl DiscoveryRequest {
    pub fn new(
        query: impl Into<String>,
        location: impl Into<String>,
        limit: usize,
        budget: Budget,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            query: query.into(),
            location: location.into(),
            limit,
            budget,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        SearchRequest::new(self.query.as_str(), self.location.as_str(), self.limit)?;
        self.budget.validate()
    }
}

/// Capabilities and configuration for a [`LeadPipeline`].
#[derive(Default)]
pub struct LeadPipelineBuilder {
    config: PipelineConfig,
    primary: Option<Arc<dyn SourceAdapter>>,
    supplemental: Vec<Arc<dyn SourceAdapter>>,
    enricher: Option<Arc<dyn DetailEnricher>>,
    verifiers: Vec<(CheckKind, Arc<dyn Verifier>)>,
}

impl LeadPipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn primary(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.primary = Some(adapter);
        self
    }

    pub fn supplemental(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.supplemental.push(adapter);
        self
    }

    pub fn enricher(mut self, enricher: Arc<dyn DetailEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Registers the verifier for one check. A later registration for the
    /// same check replaces the earlier one.
    pub fn verifier(mut self, check: CheckKind, verifier: Arc<dyn Verifier>) -> Self {
        self.verifiers.push((check, verifier));
        self
    }

    pub fn build(self) -> Result<LeadPipeline, CoreError> {
        let invalid = |error: ValidationError| CoreError::Configuration(error.to_string());

        self.config.validate().map_err(invalid)?;
        let policies = self.config.source_policies().map_err(invalid)?;
        let rules = Arc::new(self.config.rule_table().map_err(invalid)?);

        let Some(primary) = self.primary else {
            return Err(CoreError::Configuration(String::from(
                "a primary discovery source is required",
            )));
        };

        let mut meters = Meters::new(&policies);
        let mut aggregator = DiscoveryAggregator::new(meters.bind(primary, |a| a.id()));
        for adapter in self.supplemental {
            aggregator = aggregator.with_supplemental(meters.bind(adapter, |a| a.id()));
        }

        let scorer =
            PreValidationScorer::new(self.config.scoring, Arc::clone(&rules), policies.clone());

        let mut validator =
            QualityValidator::new(self.config.validation.clone(), rules).map_err(invalid)?;
        if let Some(enricher) = self.enricher {
            validator = validator.with_enricher(meters.bind(enricher, |e| e.id()));
        }
        for (check, verifier) in self.verifiers {
            validator = validator.with_verifier(check, meters.bind(verifier, |v| v.id()));
        }

        Ok(LeadPipeline {
            aggregator,
            scorer,
            validator,
        })
    }
}

/// Binds capabilities to their policies. Every capability reporting the same
/// source id shares one throttle, whichever stage or check it serves.
struct Meters<'a> {
    policies: &'a SourcePolicies,
    throttles: BTreeMap<SourceId, Throttle>,
}

impl<'a> Meters<'a> {
    fn new(policies: &'a SourcePolicies) -> Self {
        Self {
            policies,
            throttles: BTreeMap::new(),
        }
    }

    fn bind<T: ?Sized>(&mut self, capability: Arc<T>, id: impl Fn(&T) -> SourceId) -> Metered<T> {
        let id = id(capability.as_ref());
        let policy = self.policies.policy_for(&id);
        let throttle = self
            .throttles
            .entry(id)
            .or_insert_with(|| Throttle::from_policy(&policy))
            .clone();
        Metered::with_throttle(capability, policy, throttle)
    }
}

/// Discovery, pre-validation, validation and export for one query at a time.
///
/// Throttles live as long as the pipeline; budgets and counters are per run.
pub struct LeadPipeline {
    aggregator: DiscoveryAggregator,
    scorer: PreValidationScorer,
    validator: QualityValidator,
}

impl LeadPipeline {
    pub fn builder() -> LeadPipelineBuilder {
        LeadPipelineBuilder::default()
    }

    pub fn scorer(&self) -> &PreValidationScorer {
        &self.scorer
    }

    pub fn validator(&self) -> &QualityValidator {
        &self.validator
    }

    pub async fn run(&self, request: DiscoveryRequest) -> Result<PipelineReport, CoreError> {
        request.validate()?;
        let started = Instant::now();
        let tracker = CostTracker::new(&request.budget);
        info!(
            query = %request.query,
            location = %request.location,
            limit = request.limit,
            target = request.budget.target_records,
            "pipeline run started"
        );

        let discovery = self
            .aggregator
            .discover(&request.query, &request.location, request.limit, &tracker)
            .await?;

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for report in discovery.degraded_sources() {
            warnings.push(format!(
                "source '{}' {}",
                report.source,
                report.outcome.as_str()
            ));
            if let Some(error) = &report.error {
                errors.push(StageError::from_source_error(
                    Stage::Discovery,
                    &report.source,
                    error,
                ));
            }
        }
        let skipped_in_discovery = discovery
            .sources
            .iter()
            .any(|report| report.outcome == SourceOutcome::SkippedBudget);
        if skipped_in_discovery {
            errors.push(StageError::budget_exhausted(
                Stage::Discovery,
                &tracker.snapshot(),
            ));
        }
        let refusals_after_discovery = tracker.refusals();

        let mut promising = Vec::new();
        for record in &discovery.records {
            let score = self.scorer.score(record);
            if self.scorer.passes(&score) {
                promising.push((record.clone(), score));
            } else {
                debug!(
                    name = record.name(),
                    score = score.score,
                    disqualified = score.disqualified,
                    "candidate rejected by pre-validation"
                );
            }
        }
        let pre_validated = promising.len();
        info!(
            candidates = discovery.records.len(),
            pre_validated, "pre-validation complete"
        );

        let batch = self
            .validator
            .validate_batch(promising, &tracker, request.budget.target_records)
            .await;
        let tally = ValidationTally::of(&batch);
        if !skipped_in_discovery && tracker.refusals() > refusals_after_discovery {
            errors.push(StageError::budget_exhausted(
                Stage::Validation,
                &tracker.snapshot(),
            ));
        }

        let outcome = ExportGate::new(request.budget.target_records).finalize(batch.validated);
        let status = outcome.status();
        let leads = outcome.into_leads();

        let budget = tracker.snapshot();
        warnings.extend(budget_warnings(&budget));
        for warning in &warnings {
            warn!(warning = warning.as_str(), "pipeline degraded");
        }

        let stats = PipelineStats::collect(&discovery, pre_validated, tally, &leads, &budget);
        let mut meta = ReportMeta::new(self.aggregator.source_ids(), elapsed_ms(started));
        for warning in warnings {
            meta.push_warning(warning);
        }

        info!(
            request_id = %meta.request_id,
            outcome = status.as_str(),
            qualified = stats.qualified,
            validated = stats.validated,
            calls = budget.calls_made,
            cost = budget.cost_accrued,
            latency_ms = meta.latency_ms,
            "pipeline run complete"
        );

        Ok(PipelineReport {
            meta,
            outcome: status,
            leads,
            stats,
            sources: discovery.sources,
            usage: tracker.usage(),
            budget,
            errors,
        })
    }
}

impl std::fmt::Debug for LeadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeadPipeline")
            .field("aggregator", &self.aggregator)
            .field("validator", &self.validator)
            .finish()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
