use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cost::{BudgetExhausted, CostTracker};
use crate::throttling::Throttle;
use crate::{SourceId, ValidationError};

/// Trust score used for sources missing from the table.
pub const UNKNOWN_SOURCE_TRUST: u8 = 50;

const DEFAULT_TRUST: &[(&str, u8)] = &[
    (SourceId::GOOGLE_PLACES, 100),
    (SourceId::STATE_REGISTRY, 95),
    (SourceId::FOURSQUARE, 90),
    (SourceId::YELP, 80),
    ("yellow_pages", 80),
    ("linkedin", 75),
    ("facebook", 70),
    (SourceId::WEBSITE_SCRAPE, 60),
    (SourceId::DIRECTORY, 40),
];

/// Call spacing, cost and trust for one source or capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePolicy {
    pub id: SourceId,
    #[serde(default)]
    pub min_spacing_ms: u64,
    #[serde(default = "default_cost_per_call")]
    pub cost_per_call: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust: Option<u8>,
}

fn default_cost_per_call() -> f64 {
    0.01
}

impl SourcePolicy {
    /// Generic policy for sources without a tuned default.
    pub fn new(id: SourceId) -> Self {
        Self {
            id,
            min_spacing_ms: 0,
            cost_per_call: default_cost_per_call(),
            trust: None,
        }
    }

    pub fn google_places_default() -> Self {
        Self {
            id: SourceId::google_places(),
            min_spacing_ms: 100,
            cost_per_call: 0.032,
            trust: None,
        }
    }

    pub fn foursquare_default() -> Self {
        Self {
            id: SourceId::foursquare(),
            min_spacing_ms: 200,
            cost_per_call: 0.0,
            trust: None,
        }
    }

    pub fn default_for(id: &SourceId) -> Option<Self> {
        let policy = match id.as_str() {
            SourceId::GOOGLE_PLACES => Self::google_places_default(),
            SourceId::FOURSQUARE => Self::foursquare_default(),
            "yelp_fusion" | SourceId::YELP => Self {
                min_spacing_ms: 200,
                cost_per_call: 0.0,
                ..Self::new(id.clone())
            },
            "hunter_io" => Self {
                min_spacing_ms: 1_000,
                cost_per_call: 0.04,
                ..Self::new(id.clone())
            },
            SourceId::WEBSITE_PROBE | SourceId::RECORDED => Self {
                cost_per_call: 0.0,
                ..Self::new(id.clone())
            },
            "zerobounce" => Self {
                min_spacing_ms: 500,
                cost_per_call: 0.008,
                ..Self::new(id.clone())
            },
            _ => return None,
        };
        Some(policy)
    }

    pub fn with_min_spacing(mut self, spacing: Duration) -> Self {
        self.min_spacing_ms = u64::try_from(spacing.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_cost_per_call(mut self, cost: f64) -> Self {
        self.cost_per_call = cost;
        self
    }

    pub const fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.cost_per_call.is_finite() || self.cost_per_call < 0.0 {
            return Err(ValidationError::InvalidCostPerCall {
                source_id: self.id.to_string(),
            });
        }
        if let Some(trust) = self.trust {
            if trust > 100 {
                return Err(ValidationError::ThresholdOutOfRange {
                    field: "sources.trust",
                    value: u32::from(trust),
                });
            }
        }
        Ok(())
    }
}

/// Policy registry: configured overrides on top of built-in defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePolicies {
    overrides: BTreeMap<SourceId, SourcePolicy>,
}

impl SourcePolicies {
    pub fn from_configured(policies: &[SourcePolicy]) -> Result<Self, ValidationError> {
        let mut overrides = BTreeMap::new();
        for policy in policies {
            policy.validate()?;
            if overrides.insert(policy.id.clone(), policy.clone()).is_some() {
                return Err(ValidationError::DuplicateSourcePolicy {
                    source_id: policy.id.to_string(),
                });
            }
        }
        Ok(Self { overrides })
    }

    pub fn policy_for(&self, id: &SourceId) -> SourcePolicy {
        self.overrides
            .get(id)
            .cloned()
            .or_else(|| SourcePolicy::default_for(id))
            .unwrap_or_else(|| SourcePolicy::new(id.clone()))
    }

    /// Trust score in `0..=100`; configured trust wins over the built-in table.
    pub fn trust_for(&self, id: &SourceId) -> u8 {
        if let Some(trust) = self.overrides.get(id).and_then(|policy| policy.trust) {
            return trust;
        }
        DEFAULT_TRUST
            .iter()
            .find(|(name, _)| *name == id.as_str())
            .map_or(UNKNOWN_SOURCE_TRUST, |(_, trust)| *trust)
    }
}

/// A capability bound to its policy and throttle.
pub struct Metered<T: ?Sized> {
    capability: Arc<T>,
    policy: SourcePolicy,
    throttle: Throttle,
}

impl<T: ?Sized> Metered<T> {
    pub fn new(capability: Arc<T>, policy: SourcePolicy) -> Self {
        let throttle = Throttle::from_policy(&policy);
        Self::with_throttle(capability, policy, throttle)
    }

    /// Binds `capability` to an existing throttle, so calls through this
    /// handle and every other holder of a clone share one spacing.
    pub fn with_throttle(capability: Arc<T>, policy: SourcePolicy, throttle: Throttle) -> Self {
        Self {
            capability,
            policy,
            throttle,
        }
    }

    pub fn id(&self) -> &SourceId {
        &self.policy.id
    }

    pub fn policy(&self) -> &SourcePolicy {
        &self.policy
    }

    /// Reserves budget for one call. Reservation happens before dispatch so a
    /// refused call is never issued.
    pub fn reserve(&self, tracker: &CostTracker) -> Result<(), BudgetExhausted> {
        tracker.reserve(&self.policy.id, self.policy.cost_per_call)
    }

    /// Waits for this capability's next call slot.
    pub async fn throttled(&self) -> &T {
        self.throttle.until_ready().await;
        self.capability.as_ref()
    }
}

impl<T: ?Sized> std::fmt::Debug for Metered<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metered")
            .field("policy", &self.policy)
            .field("throttle", &self.throttle)
            .finish()
    }
}
