use thiserror::Error;

use crate::data_source::SourceError;

/// Input, record and configuration validation errors exposed by `prospect-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("location must not be empty")]
    EmptyLocation,
    #[error("limit must be greater than zero")]
    ZeroLimit,
    #[error("budget target_records must be greater than zero")]
    ZeroTargetRecords,
    #[error("budget cost_ceiling must be finite and non-negative: {value}")]
    InvalidCostCeiling { value: String },

    #[error("source id cannot be empty")]
    EmptySourceId,
    #[error("source id '{value}' contains invalid character '{ch}'")]
    SourceIdInvalidChar { value: String, ch: char },
    #[error("business name cannot be empty")]
    EmptyBusinessName,
    #[error("rating must be finite and within 0..=5, got {value}")]
    InvalidRating { value: String },

    #[error("{field} weights must sum to 100, got {sum}")]
    WeightsNotNormalized { field: &'static str, sum: u32 },
    #[error("threshold '{field}' must be within 0..=100, got {value}")]
    ThresholdOutOfRange { field: &'static str, value: u32 },
    #[error("check '{check}' is required and cannot be skippable")]
    RequiredCheckSkippable { check: &'static str },
    #[error("check '{check}' must remain required")]
    MandatoryCheckMissing { check: &'static str },
    #[error("max_concurrency must be greater than zero")]
    ZeroConcurrency,
    #[error("rule '{label}' has an invalid pattern: {reason}")]
    InvalidRulePattern { label: String, reason: String },
    #[error("unknown rule target '{value}', expected one of name, address, phone, website, email")]
    InvalidRuleTarget { value: String },
    #[error("unknown check '{value}', expected one of phone, website, email, address")]
    InvalidCheck { value: String },
    #[error("duplicate source policy for '{source_id}'")]
    DuplicateSourcePolicy { source_id: String },
    #[error("cost_per_call for '{source_id}' must be finite and non-negative")]
    InvalidCostPerCall { source_id: String },

    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Top-level error type for pipeline operations.
///
/// Per-source and per-candidate failures never surface here; they are folded
/// into the report. Only invalid input, unusable configuration, or a batch in
/// which every invoked source was unavailable abort a run.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("all {attempted} discovery source(s) were unavailable")]
    AllSourcesUnavailable {
        attempted: usize,
        errors: Vec<SourceError>,
    },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "pipeline.invalid_input",
            Self::Configuration(_) | Self::ConfigParse(_) => "pipeline.configuration",
            Self::AllSourcesUnavailable { .. } => "pipeline.all_sources_unavailable",
            Self::Io(_) => "pipeline.io",
            Self::Serialization(_) => "pipeline.serialization",
        }
    }
}
