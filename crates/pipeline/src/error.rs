use std::fmt;

use adva_llm::LlmError;
use adva_store::StoreError;

/// Errors a pipeline stage can raise. Mirrors the §7 taxonomy: transient and
/// quota errors stop the file (retried on a later scan); permanent errors
/// send the file to `sin_procesar`; storage errors are surfaced immediately.
#[derive(Debug)]
pub enum PipelineError {
    Storage(StoreError),
    Llm(LlmError),
    Validation(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::Llm(e) => write!(f, "llm error: {e}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        Self::Storage(e)
    }
}

impl From<LlmError> for PipelineError {
    fn from(e: LlmError) -> Self {
        Self::Llm(e)
    }
}
