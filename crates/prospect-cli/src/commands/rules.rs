use prospect_core::{PipelineConfig, Rule, RuleSpec};
use serde::Serialize;

use crate::error::CliError;

use super::Envelope;

/// Rules in the same shape as `[[rules]]` configuration entries, so any row
/// can be pasted back into a config file.
#[derive(Debug, Serialize)]
struct RulesResponseData {
    rules: Vec<RuleSpec>,
}

pub fn run(config: &PipelineConfig) -> Result<Envelope, CliError> {
    let table = config.rule_table()?;
    let rules = table.rules().iter().map(Rule::to_spec).collect();

    let data = serde_json::to_value(RulesResponseData { rules })?;
    Ok(Envelope::ok(data, Vec::new()))
}
