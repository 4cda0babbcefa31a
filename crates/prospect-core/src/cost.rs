//! Per-request accounting of external calls and their cost.
//!
//! One [`CostTracker`] is created for every pipeline run and passed by
//! reference to each stage that issues paid calls. The request totals sit
//! behind one mutex so the limit checks and the charge are a single step for
//! concurrent discovery adapters and validation tasks; per-source counters are
//! atomics.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use thiserror::Error;

use crate::{Budget, BudgetState, SourceId};

const MICROS_PER_UNIT: f64 = 1_000_000.0;

/// Returned by [`CostTracker::reserve`] once no further calls may be issued.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("budget exhausted after {calls_made}/{calls_max} calls and {cost_accrued:.4}/{cost_ceiling:.4} cost")]
pub struct BudgetExhausted {
    pub calls_made: u64,
    pub calls_max: u64,
    pub cost_accrued: f64,
    pub cost_ceiling: f64,
}

/// Calls and cost attributed to one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceUsage {
    pub source: SourceId,
    pub calls: u64,
    pub cost: f64,
}

#[derive(Debug, Default)]
struct SourceCounters {
    calls: AtomicU64,
    cost_micros: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    calls_made: u64,
    cost_micros: u64,
}

/// Budget reservation and usage counters for one request.
#[derive(Debug)]
pub struct CostTracker {
    calls_max: u64,
    cost_ceiling_micros: u64,
    totals: Mutex<Totals>,
    refusals: AtomicU64,
    per_source: RwLock<BTreeMap<SourceId, Arc<SourceCounters>>>,
}

impl CostTracker {
    pub fn new(budget: &Budget) -> Self {
        Self {
            calls_max: budget.max_external_calls,
            cost_ceiling_micros: to_micros(budget.cost_ceiling),
            totals: Mutex::new(Totals::default()),
            refusals: AtomicU64::new(0),
            per_source: RwLock::new(BTreeMap::new()),
        }
    }

    /// Reserves one call for `source`, charging `cost_per_call` up front.
    ///
    /// Fails when `max_external_calls` calls were already reserved or when the
    /// charge would take the accrued cost past the ceiling. A failed
    /// reservation changes nothing but the refusal count.
    pub fn reserve(&self, source: &SourceId, cost_per_call: f64) -> Result<(), BudgetExhausted> {
        let cost = to_micros(cost_per_call);

        {
            let mut totals = self.lock_totals();
            let accrued = totals.cost_micros.saturating_add(cost);
            if totals.calls_made >= self.calls_max
                || totals.cost_micros >= self.cost_ceiling_micros
                || accrued > self.cost_ceiling_micros
            {
                self.refusals.fetch_add(1, Ordering::AcqRel);
                return Err(self.exhausted_error(*totals));
            }
            totals.calls_made += 1;
            totals.cost_micros = accrued;
        }

        let counters = self.counters_for(source);
        counters.calls.fetch_add(1, Ordering::AcqRel);
        counters.cost_micros.fetch_add(cost, Ordering::AcqRel);
        Ok(())
    }

    /// Number of reservations refused so far.
    pub fn refusals(&self) -> u64 {
        self.refusals.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> BudgetState {
        self.state_of(*self.lock_totals())
    }

    /// Per-source usage in source id order.
    pub fn usage(&self) -> Vec<SourceUsage> {
        let per_source = self
            .per_source
            .read()
            .expect("cost tracker source map should not be poisoned");
        per_source
            .iter()
            .map(|(source, counters)| SourceUsage {
                source: source.clone(),
                calls: counters.calls.load(Ordering::Acquire),
                cost: from_micros(counters.cost_micros.load(Ordering::Acquire)),
            })
            .collect()
    }

    pub fn calls_for(&self, source: &SourceId) -> u64 {
        self.per_source
            .read()
            .expect("cost tracker source map should not be poisoned")
            .get(source)
            .map_or(0, |counters| counters.calls.load(Ordering::Acquire))
    }

    fn counters_for(&self, source: &SourceId) -> Arc<SourceCounters> {
        if let Some(counters) = self
            .per_source
            .read()
            .expect("cost tracker source map should not be poisoned")
            .get(source)
        {
            return Arc::clone(counters);
        }

        let mut per_source = self
            .per_source
            .write()
            .expect("cost tracker source map should not be poisoned");
        Arc::clone(per_source.entry(source.clone()).or_default())
    }

    fn lock_totals(&self) -> std::sync::MutexGuard<'_, Totals> {
        self.totals
            .lock()
            .expect("cost tracker totals should not be poisoned")
    }

    fn state_of(&self, totals: Totals) -> BudgetState {
        BudgetState {
            calls_made: totals.calls_made,
            calls_max: self.calls_max,
            cost_accrued: from_micros(totals.cost_micros),
            cost_ceiling: from_micros(self.cost_ceiling_micros),
        }
    }

    fn exhausted_error(&self, totals: Totals) -> BudgetExhausted {
        let state = self.state_of(totals);
        BudgetExhausted {
            calls_made: state.calls_made,
            calls_max: state.calls_max,
            cost_accrued: state.cost_accrued,
            cost_ceiling: state.cost_ceiling,
        }
    }
}

fn to_micros(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value * MICROS_PER_UNIT).round().min(u64::MAX as f64) as u64
}

fn from_micros(value: u64) -> f64 {
    value as f64 / MICROS_PER_UNIT
}
