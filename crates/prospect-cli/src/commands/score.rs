use std::sync::Arc;

use prospect_core::{PipelineConfig, PreValidationScorer, ScoreResult, Snapshot, SourceId};
use serde::Serialize;
use tracing::warn;

use crate::cli::ScoreArgs;
use crate::error::CliError;

use super::Envelope;

#[derive(Debug, Serialize)]
struct ScoredRecord {
    source: SourceId,
    name: String,
    address: String,
    passes: bool,
    score: ScoreResult,
}

#[derive(Debug, Serialize)]
struct ScoreResponseData {
    threshold: u32,
    records: Vec<ScoredRecord>,
}

/// Scores snapshot records as recorded, without merging or verification.
pub fn run(args: &ScoreArgs, config: &PipelineConfig) -> Result<Envelope, CliError> {
    let snapshot = Snapshot::load(&args.snapshot)?;
    let scorer = PreValidationScorer::new(
        config.scoring.clone(),
        Arc::new(config.rule_table()?),
        config.source_policies()?,
    );

    let mut warnings = Vec::new();
    let mut records = Vec::new();
    for batch in &snapshot.sources {
        for entry in &batch.records {
            let record = match entry.to_record(&batch.source) {
                Ok(record) => record,
                Err(error) => {
                    warn!(source = %batch.source, name = %entry.name, %error, "skipping record");
                    warnings.push(format!("{}: skipped '{}': {error}", batch.source, entry.name));
                    continue;
                }
            };
            let score = scorer.score(&record);
            let passes = scorer.passes(&score);
            if args.passing && !passes {
                continue;
            }
            records.push(ScoredRecord {
                source: batch.source.clone(),
                name: record.name().to_owned(),
                address: record.address().to_owned(),
                passes,
                score,
            });
        }
    }

    let sources = snapshot
        .sources
        .iter()
        .map(|batch| batch.source.clone())
        .collect();
    let data = serde_json::to_value(ScoreResponseData {
        threshold: scorer.threshold(),
        records,
    })?;

    Ok(Envelope::ok(data, sources).with_warnings(warnings))
}
