//! # Prospect Core
//!
//! Lead-qualification pipeline: multi-source business discovery, cheap
//! pre-validation scoring, authoritative field validation and a final export
//! gate that never lets an unverified record out.
//!
//! ## Overview
//!
//! - **Capability traits** for discovery sources, detail enrichers and field
//!   verifiers; the pipeline depends on nothing else
//! - **Cost tracking** with per-source counters and budget reservation
//! - **Data-driven disqualifiers** (veto and penalty rules) shared by the
//!   scorer and the validator
//! - **Per-source throttling** with a minimum spacing between calls
//! - **Structured report** with per-stage statistics and degraded sources
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | File-backed snapshot discovery source |
//! | [`aggregator`] | Concurrent discovery fan-out, merge and dedupe |
//! | [`config`] | TOML pipeline configuration |
//! | [`cost`] | Budget reservation and per-source usage |
//! | [`data_source`] | Capability traits and `SourceError` |
//! | [`domain`] | Business records, budgets, timestamps |
//! | [`error`] | Core error types |
//! | [`gate`] | Export gate and quality grades |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`pipeline`] | Stage orchestration |
//! | [`report`] | Run report and statistics |
//! | [`rules`] | Disqualifying rule table |
//! | [`scoring`] | Pre-validation scorer |
//! | [`source`] | Source identifiers |
//! | [`source_policy`] | Spacing, cost and trust per source |
//! | [`throttling`] | Minimum-spacing throttle |
//! | [`validator`] | Enrichment, field checks, confidence |
//! | [`verifiers`] | Bundled verifier implementations |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prospect_core::{Budget, CheckKind, DiscoveryRequest, HttpWebsiteVerifier, LeadPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = LeadPipeline::builder()
//!         .primary(Arc::new(MyPlacesAdapter::from_env()?))
//!         .verifier(CheckKind::Website, Arc::new(HttpWebsiteVerifier::new()))
//!         .verifier(CheckKind::Email, Arc::new(MyEmailVerifier::from_env()?))
//!         .build()?;
//!
//!     let request = DiscoveryRequest::new("plumbers", "Austin, TX", 20, Budget::default())?;
//!     let report = pipeline.run(request).await?;
//!
//!     for lead in &report.leads {
//!         println!("{} ({}): {}", lead.record.name(), lead.grade, lead.confidence());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────┐
//! │ DiscoveryAggregator  │─────▶│ CostTracker  │
//! │ (SourceAdapter × N)  │      └──────────────┘
//! └──────────┬───────────┘             ▲
//!            ▼                         │
//! ┌──────────────────────┐             │
//! │ PreValidationScorer  │  pure       │
//! └──────────┬───────────┘             │
//!            ▼                         │
//! ┌──────────────────────┐             │
//! │ QualityValidator     │─────────────┘
//! │ (enricher, verifiers)│
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │ ExportGate           │──▶ PipelineReport
//! └──────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Source failures never abort a run on their own:
//!
//! ```rust
//! use prospect_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::NotConfigured => "adapter disabled for this run",
//!         SourceErrorKind::RateLimited | SourceErrorKind::Unavailable => "source skipped",
//!         _ => "source contributed nothing",
//!     }
//! }
//! ```

pub mod adapters;
pub mod aggregator;
pub mod config;
pub mod cost;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod gate;
pub mod http_client;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod scoring;
pub mod source;
pub mod source_policy;
pub mod throttling;
pub mod validator;
pub mod verifiers;

// Bundled discovery sources
pub use adapters::{Snapshot, SnapshotBatch, SnapshotEntry, SnapshotSource};

// Discovery
pub use aggregator::{Discovery, DiscoveryAggregator, SourceOutcome, SourceReport, SourceRole};

// Configuration
pub use config::{PipelineConfig, CONFIG_ENV_VAR};

// Cost tracking
pub use cost::{BudgetExhausted, CostTracker, SourceUsage};

// Capabilities
pub use data_source::{
    BusinessIdentity, CheckKind, DetailEnricher, EnrichedDetails, SearchRequest, SourceAdapter,
    SourceError, SourceErrorKind, SourceFuture, Verdict, VerificationSubject, Verifier,
};

// Domain models
pub use domain::{Budget, BudgetState, BusinessRecord, ContactField, UtcDateTime};

// Error types
pub use error::{CoreError, ValidationError};

// Export gate
pub use gate::{ExportGate, ExportOutcome, OutcomeStatus, QualifiedLead, QualityGrade};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Pipeline
pub use pipeline::{DiscoveryRequest, LeadPipeline, LeadPipelineBuilder};

// Report
pub use report::{PipelineReport, PipelineStats, ReportMeta, Stage, StageError};

// Rules
pub use rules::{Rule, RuleAction, RuleMatch, RuleSpec, RuleTable, RuleTarget};

// Scoring
pub use scoring::{PreValidationScorer, ScoreResult, ScoreWeights, ScoringConfig};

// Source identifiers and policies
pub use source::SourceId;
pub use source_policy::{Metered, SourcePolicies, SourcePolicy};

// Throttling
pub use throttling::Throttle;

// Validation
pub use validator::{
    CheckStatus, CheckWeights, FieldCheck, QualityValidator, ValidatedRecord, ValidationConfig,
    ValidationResult,
};

// Bundled verifiers
pub use verifiers::{HttpWebsiteVerifier, RecordedVerdict, RecordedVerifier};
