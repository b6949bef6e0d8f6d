use std::fmt;

/// Error taxonomy for a vision-LLM call (§4.4). The gateway classifies every
/// failure into exactly one of these kinds; callers branch on the kind, not
/// on HTTP status codes.
#[derive(Debug)]
pub enum LlmError {
    /// 429 with "quota" in the body. Fail fast, do not retry this run.
    QuotaExceeded(String),
    /// 429 without "quota", 408/500/502/503/504, or a network-level failure.
    /// Exhausted after the retry budget.
    Retryable(String),
    /// Any other 4xx, or an empty/malformed model response.
    Permanent(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaExceeded(s) => write!(f, "quota exceeded: {s}"),
            Self::Retryable(s) => write!(f, "retryable error: {s}"),
            Self::Permanent(s) => write!(f, "permanent error: {s}"),
        }
    }
}

impl std::error::Error for LlmError {}
