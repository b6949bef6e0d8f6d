use adva_pipeline::PipelineError;
use adva_recon::ReconError;
use adva_store::StoreError;

use crate::exit_codes::{EXIT_CONFIG_INVALID, EXIT_CONFIG_MISSING_KEY, EXIT_STORAGE, EXIT_USAGE};

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG_INVALID, message: msg.into(), hint: None }
    }

    pub fn missing_key(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG_MISSING_KEY, message: msg.into(), hint: None }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_STORAGE, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn print(&self) {
        eprintln!("error: {}", self.message);
        if let Some(hint) = &self.hint {
            eprintln!("hint: {hint}");
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::storage(e.to_string())
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        Self { code: EXIT_STORAGE, message: e.to_string(), hint: None }
    }
}

impl From<ReconError> for CliError {
    fn from(e: ReconError) -> Self {
        Self::config(e.to_string())
    }
}
