use thiserror::Error;

use prospect_core::CoreError;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] prospect_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Pipeline(#[from] CoreError),

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Pipeline(
                CoreError::InvalidInput(_)
                | CoreError::Configuration(_)
                | CoreError::ConfigParse(_),
            ) => 2,
            Self::Pipeline(CoreError::Io(_)) => 10,
            Self::Pipeline(_) => 3,
            Self::StrictModeViolation { .. } => 5,
            Self::Serialization(_) => 10,
            Self::Io(_) => 10,
        }
    }
}
