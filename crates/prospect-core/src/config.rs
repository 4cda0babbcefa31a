//! Pipeline configuration.
//!
//! Every section has defaults, so an empty document is a valid configuration:
//!
//! ```toml
//! [scoring]
//! threshold = 70
//!
//! [validation]
//! threshold = 80
//! required_checks = ["website", "email"]
//! skippable_checks = ["phone"]
//!
//! [[sources]]
//! id = "google_places"
//! min_spacing_ms = 100
//! cost_per_call = 0.032
//!
//! [[rules]]
//! label = "name.franchise_marker"
//! target = "name"
//! pattern = "(?i)franchise opportunity"
//! action = "veto"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::rules::{RuleSpec, RuleTable};
use crate::scoring::ScoringConfig;
use crate::source_policy::{SourcePolicies, SourcePolicy};
use crate::validator::ValidationConfig;
use crate::{CoreError, ValidationError};

/// Environment variable consulted for the configuration path.
pub const CONFIG_ENV_VAR: &str = "PROSPECT_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub scoring: ScoringConfig,
    pub validation: ValidationConfig,
    pub sources: Vec<SourcePolicy>,
    /// Rules appended to the built-in disqualifier table.
    pub rules: Vec<RuleSpec>,
}

impl PipelineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.scoring.validate()?;
        self.validation.validate()?;
        self.source_policies()?;
        self.rule_table()?;
        Ok(())
    }

    pub fn source_policies(&self) -> Result<SourcePolicies, ValidationError> {
        SourcePolicies::from_configured(&self.sources)
    }

    /// Built-in rules followed by the configured ones.
    pub fn rule_table(&self) -> Result<RuleTable, ValidationError> {
        RuleTable::with_configured(&self.rules)
    }
}
