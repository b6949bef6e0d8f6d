//! Vision-LLM gateway (§4.4).
//!
//! One blocking HTTP call per attempt, gated by the shared rate limiter and
//! wrapped in exponential backoff with jitter. Mirrors the retry shape of
//! `FetchClient::request_with_retry` in spirit (classify status -> retry or
//! fail), generalized to a taxonomy of three kinds instead of CLI exit codes.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use adva_core::rate_limiter::RateLimiter;
use base64::Engine;
use rand::Rng;
use serde_json::json;

use crate::error::LlmError;

const BASE_DELAY_MS: u64 = 1000;
const MAX_DELAY_MS: u64 = 30_000;
const TEMPERATURE: f64 = 0.1;
const TOP_P: f64 = 0.8;
const MAX_OUTPUT_TOKENS: u32 = 2048;

pub struct LlmGateway {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    rate_limiter: Arc<RateLimiter>,
    sleeper: Box<dyn Fn(Duration) + Send + Sync>,
}

impl LlmGateway {
    /// `endpoint` is the full model URL (without the `key` query param,
    /// which is appended on each request).
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, rate_limiter: Arc<RateLimiter>) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            rate_limiter,
            sleeper: Box::new(thread::sleep),
        }
    }

    /// Override the sleep function; used in tests to avoid real delays.
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Send `bytes` (as `mime_type`) with `prompt` to the model, retrying up
    /// to `max_retries` times. At least one attempt is always made.
    pub fn analyze_document(
        &self,
        bytes: &[u8],
        mime_type: &str,
        prompt: &str,
        max_retries: u32,
    ) -> Result<String, LlmError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": mime_type, "data": base64::engine::general_purpose::STANDARD.encode(bytes) } },
                ],
            }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "topP": TOP_P,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            },
        });

        let mut attempt = 0u32;
        loop {
            let check = self.rate_limiter.check("gemini");
            if !check.allowed {
                (self.sleeper)(Duration::from_millis(check.reset_ms));
                continue;
            }

            let result = self
                .http
                .post(&self.endpoint)
                .query(&[("key", self.api_key.as_str())])
                .json(&body)
                .send();

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let text = resp.text().unwrap_or_default();

                    if status == 429 && text.to_lowercase().contains("quota") {
                        return Err(LlmError::QuotaExceeded(text));
                    }

                    let retryable = status == 429
                        || status == 408
                        || status == 500
                        || status == 502
                        || status == 503
                        || status == 504;

                    if retryable {
                        if attempt >= max_retries {
                            return Err(LlmError::Retryable(format!("HTTP {status} after {attempt} retries: {text}")));
                        }
                        self.backoff_sleep(attempt);
                        attempt += 1;
                        continue;
                    }

                    if status >= 400 {
                        return Err(LlmError::Permanent(format!("HTTP {status}: {text}")));
                    }

                    let value: serde_json::Value = serde_json::from_str(&text)
                        .map_err(|e| LlmError::Permanent(format!("invalid JSON response: {e}")))?;
                    return extract_text(&value);
                }
                Err(e) => {
                    if attempt >= max_retries {
                        return Err(LlmError::Retryable(format!("network error after {attempt} retries: {e}")));
                    }
                    self.backoff_sleep(attempt);
                    attempt += 1;
                }
            }
        }
    }

    fn backoff_sleep(&self, attempt: u32) {
        let base = BASE_DELAY_MS.saturating_mul(1u64 << attempt.min(20));
        let capped = base.min(MAX_DELAY_MS);
        let jitter_factor = rand::thread_rng().gen_range(0.8..=1.2);
        let delay_ms = (capped as f64 * jitter_factor) as u64;
        (self.sleeper)(Duration::from_millis(delay_ms));
    }
}

/// Extract the first candidate's first text part; empty/missing is a
/// permanent error (§4.4).
fn extract_text(value: &serde_json::Value) -> Result<String, LlmError> {
    let text = value
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str());

    match text {
        Some(t) if !t.trim().is_empty() => Ok(t.to_string()),
        _ => Err(LlmError::Permanent("empty or missing text in model response".to_string())),
    }
}
