use serde::Serialize;
use uuid::Uuid;

use crate::aggregator::{Discovery, SourceReport};
use crate::cost::SourceUsage;
use crate::data_source::SourceError;
use crate::gate::{OutcomeStatus, QualifiedLead};
use crate::validator::BatchValidation;
use crate::{BudgetState, SourceId, UtcDateTime, ValidationError};

/// Share of calls or cost after which the report carries a budget warning.
pub const BUDGET_WARNING_UTILIZATION: f64 = 0.8;

/// Result of one pipeline run, in the shape written by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub meta: ReportMeta,
    pub outcome: OutcomeStatus,
    pub leads: Vec<QualifiedLead>,
    pub stats: PipelineStats,
    pub sources: Vec<SourceReport>,
    pub usage: Vec<SourceUsage>,
    pub budget: BudgetState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StageError>,
}

impl PipelineReport {
    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    pub request_id: String,
    pub generated_at: UtcDateTime,
    /// Discovery sources consulted, in merge order.
    pub sources: Vec<SourceId>,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ReportMeta {
    pub fn new(sources: Vec<SourceId>, latency_ms: u64) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            generated_at: UtcDateTime::now(),
            sources,
            latency_ms,
            warnings: Vec::new(),
        }
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Discovery,
    Validation,
}

/// Structured error for a degraded but non-fatal stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageError {
    pub stage: Stage,
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceId>,
}

impl StageError {
    pub fn new(
        stage: Stage,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let error = Self {
            stage,
            code: code.into(),
            message: message.into(),
            retryable: false,
            source: None,
        };
        error.validate()?;
        Ok(error)
    }

    /// Converts a capability failure. Blank messages fall back to the code.
    pub fn from_source_error(stage: Stage, source: &SourceId, error: &SourceError) -> Self {
        let message = if error.message().trim().is_empty() {
            error.code().to_owned()
        } else {
            error.message().to_owned()
        };
        Self {
            stage,
            code: error.code().to_owned(),
            message,
            retryable: error.retryable(),
            source: Some(source.clone()),
        }
    }

    pub fn budget_exhausted(stage: Stage, budget: &BudgetState) -> Self {
        Self {
            stage,
            code: String::from("budget.exhausted"),
            message: format!(
                "budget exhausted after {}/{} calls and {:.4}/{:.4} cost",
                budget.calls_made, budget.calls_max, budget.cost_accrued, budget.cost_ceiling
            ),
            retryable: false,
            source: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::EmptyErrorCode);
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyErrorMessage);
        }
        Ok(())
    }
}

/// Per-stage counters of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Unique candidates before truncation.
    pub found: usize,
    pub duplicates_removed: usize,
    /// Candidates handed to the scorer.
    pub candidates: usize,
    /// Candidates that passed the pre-validation gate.
    pub pre_validated: usize,
    pub rejected: usize,
    pub validated: usize,
    /// Promising candidates left unvalidated once the target was reached.
    pub not_validated: usize,
    pub inconclusive: usize,
    pub qualified: usize,
    /// `qualified / validated`, or 0 when nothing was validated.
    pub qualification_rate: f64,
    /// Mean confidence of exported leads.
    pub average_confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_per_lead: Option<f64>,
}

/// Validation counters taken before the batch is handed to the export gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationTally {
    pub validated: usize,
    pub not_validated: usize,
    pub inconclusive: usize,
}

impl ValidationTally {
    pub fn of(batch: &BatchValidation) -> Self {
        Self {
            validated: batch.validated.len(),
            not_validated: batch.not_validated,
            inconclusive: batch
                .validated
                .iter()
                .filter(|candidate| candidate.validation.inconclusive)
                .count(),
        }
    }
}

impl PipelineStats {
    pub fn collect(
        discovery: &Discovery,
        pre_validated: usize,
        tally: ValidationTally,
        leads: &[QualifiedLead],
        budget: &BudgetState,
    ) -> Self {
        let candidates = discovery.records.len();
        let ValidationTally {
            validated,
            not_validated,
            inconclusive,
        } = tally;
        let qualified = leads.len();

        let qualification_rate = ratio(qualified as f64, validated as f64);
        let average_confidence = ratio(
            leads.iter().map(|lead| f64::from(lead.confidence())).sum(),
            qualified as f64,
        );
        let cost_per_lead = (qualified > 0).then(|| budget.cost_accrued / qualified as f64);

        Self {
            found: discovery.found,
            duplicates_removed: discovery.duplicates_removed,
            candidates,
            pre_validated,
            rejected: candidates.saturating_sub(pre_validated),
            validated,
            not_validated,
            inconclusive,
            qualified,
            qualification_rate,
            average_confidence,
            cost_per_lead,
        }
    }
}

/// Warnings for a spent or nearly spent budget.
pub fn budget_warnings(budget: &BudgetState) -> Vec<String> {
    if budget.exhausted() {
        return vec![format!(
            "budget exhausted: {}/{} calls, {:.4}/{:.4} cost; results may be partial",
            budget.calls_made, budget.calls_max, budget.cost_accrued, budget.cost_ceiling
        )];
    }
    let utilization = budget.utilization();
    if utilization >= BUDGET_WARNING_UTILIZATION {
        return vec![format!(
            "budget {:.0}% used ({}/{} calls, {:.4}/{:.4} cost)",
            utilization * 100.0,
            budget.calls_made,
            budget.calls_max,
            budget.cost_accrued,
            budget.cost_ceiling
        )];
    }
    Vec::new()
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
