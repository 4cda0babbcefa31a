use std::sync::Arc;

use prospect_core::{
    Budget, BudgetState, CheckKind, DiscoveryRequest, HttpWebsiteVerifier, LeadPipeline,
    OutcomeStatus, PipelineConfig, PipelineStats, QualifiedLead, Snapshot, SourceAdapter,
    SourceReport, SourceUsage, Verifier,
};
use serde::Serialize;
use tracing::info;

use crate::cli::DiscoverArgs;
use crate::error::CliError;

use super::Envelope;

#[derive(Debug, Serialize)]
struct DiscoverResponseData {
    outcome: OutcomeStatus,
    leads: Vec<QualifiedLead>,
    stats: PipelineStats,
    sources: Vec<SourceReport>,
    usage: Vec<SourceUsage>,
    budget: BudgetState,
}

pub async fn run(args: &DiscoverArgs, config: PipelineConfig) -> Result<Envelope, CliError> {
    let budget = Budget::new(args.target, args.max_calls, args.cost_ceiling)?;
    let request = DiscoveryRequest::new(
        args.query.as_str(),
        args.location.as_str(),
        args.limit,
        budget,
    )?;

    let snapshot = Snapshot::load(&args.snapshot)?;
    let pipeline = build_pipeline(&snapshot, config, args.probe_websites)?;
    let warnings = unverifiable_checks(&pipeline)
        .into_iter()
        .map(|check| {
            format!("no verifier for required check '{check}'; candidates will stay inconclusive")
        })
        .collect::<Vec<_>>();

    info!(
        query = %request.query,
        location = %request.location,
        sources = snapshot.sources.len(),
        verdicts = snapshot.verdicts.len(),
        "running discovery from snapshot"
    );
    let report = pipeline.run(request).await?;

    let data = serde_json::to_value(DiscoverResponseData {
        outcome: report.outcome,
        leads: report.leads,
        stats: report.stats,
        sources: report.sources,
        usage: report.usage,
        budget: report.budget,
    })?;

    Ok(Envelope::with_meta(data, report.meta)
        .with_warnings(warnings)
        .with_errors(report.errors))
}

/// First snapshot batch is the primary source; recorded verdicts back every
/// check they cover.
fn build_pipeline(
    snapshot: &Snapshot,
    config: PipelineConfig,
    probe_websites: bool,
) -> Result<LeadPipeline, CliError> {
    let mut adapters = snapshot.adapters().into_iter();
    let primary = adapters
        .next()
        .ok_or_else(|| CliError::Command(String::from("snapshot contains no sources")))?;

    let mut builder = LeadPipeline::builder()
        .config(config)
        .primary(Arc::new(primary) as Arc<dyn SourceAdapter>);
    for adapter in adapters {
        builder = builder.supplemental(Arc::new(adapter));
    }

    let recorded: Arc<dyn Verifier> = Arc::new(snapshot.verifier());
    for check in snapshot.recorded_checks() {
        if probe_websites && check == CheckKind::Website {
            continue;
        }
        builder = builder.verifier(check, Arc::clone(&recorded));
    }
    if probe_websites {
        builder = builder.verifier(CheckKind::Website, Arc::new(HttpWebsiteVerifier::new()));
    }

    Ok(builder.build()?)
}

fn unverifiable_checks(pipeline: &LeadPipeline) -> Vec<CheckKind> {
    let validator = pipeline.validator();
    validator
        .config()
        .required_checks
        .iter()
        .copied()
        .filter(|check| !validator.has_verifier(*check))
        .collect()
}
