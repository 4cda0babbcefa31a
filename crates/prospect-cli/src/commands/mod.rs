mod discover;
mod rules;
mod score;

use std::path::{Path, PathBuf};
use std::time::Instant;

use prospect_core::{PipelineConfig, ReportMeta, SourceId, StageError, CONFIG_ENV_VAR};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Output document shared by every command.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub meta: ReportMeta,
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StageError>,
}

impl Envelope {
    pub fn ok(data: Value, sources: Vec<SourceId>) -> Self {
        Self {
            meta: ReportMeta::new(sources, 0),
            data,
            errors: Vec::new(),
        }
    }

    /// Wraps data under metadata produced by a pipeline run.
    pub fn with_meta(data: Value, meta: ReportMeta) -> Self {
        Self {
            meta,
            data,
            errors: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.meta.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<StageError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.meta.latency_ms = latency_ms;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let config = load_config(cli.config.as_deref())?;
    let started = Instant::now();

    let envelope = match &cli.command {
        Command::Discover(args) => discover::run(args, config).await?,
        Command::Score(args) => score::run(args, &config)?.with_latency(elapsed_ms(started)),
        Command::Rules => rules::run(&config)?.with_latency(elapsed_ms(started)),
    };

    Ok(envelope)
}

/// Explicit path first, then the environment, then built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<PipelineConfig, CliError> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    match path {
        Some(path) => {
            info!(path = %path.display(), "loading pipeline configuration");
            Ok(PipelineConfig::load(&path)?)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
