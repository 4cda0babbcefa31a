use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Spending limits for one discovery request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Maximum number of qualified leads to export.
    pub target_records: usize,
    /// Ceiling on discovery, enrichment and verification calls.
    pub max_external_calls: u64,
    /// Ceiling on accrued cost, in the currency of the configured call costs.
    pub cost_ceiling: f64,
}

impl Budget {
    pub fn new(
        target_records: usize,
        max_external_calls: u64,
        cost_ceiling: f64,
    ) -> Result<Self, ValidationError> {
        let budget = Self {
            target_records,
            max_external_calls,
            cost_ceiling,
        };
        budget.validate()?;
        Ok(budget)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.target_records == 0 {
            return Err(ValidationError::ZeroTargetRecords);
        }
        if !self.cost_ceiling.is_finite() || self.cost_ceiling < 0.0 {
            return Err(ValidationError::InvalidCostCeiling {
                value: self.cost_ceiling.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            target_records: 10,
            max_external_calls: 200,
            cost_ceiling: 5.0,
        }
    }
}

/// Point-in-time view of the cost tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetState {
    pub calls_made: u64,
    pub calls_max: u64,
    pub cost_accrued: f64,
    pub cost_ceiling: f64,
}

impl BudgetState {
    pub fn exhausted(&self) -> bool {
        self.calls_made >= self.calls_max || self.cost_accrued >= self.cost_ceiling
    }

    /// Highest of the call and cost utilization ratios, in `0.0..=1.0` while
    /// within budget.
    pub fn utilization(&self) -> f64 {
        let calls = ratio(self.calls_made as f64, self.calls_max as f64);
        let cost = ratio(self.cost_accrued, self.cost_ceiling);
        calls.max(cost)
    }
}

fn ratio(used: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        1.0
    } else {
        used / limit
    }
}
