//! Extraction response parsing (§4.5): pull JSON out of a model reply, and
//! turn the extracted fields into a direction + confidence + review flag.

use std::sync::OnceLock;

use adva_core::{is_valid_cuit, normalize_cuit, Direction, ADVA_CUIT};
use regex::Regex;

use crate::error::LlmError;

/// Strip markdown fences and surrounding prose, then parse the first
/// `{...}` span as JSON. Fails if no braces are present at all.
pub fn extract_json(raw: &str) -> Result<serde_json::Value, LlmError> {
    let mut text = raw.trim();

    if let Some(fence_start) = text.find("```") {
        let after_fence = &text[fence_start + 3..];
        let after_fence = after_fence.strip_prefix("json").unwrap_or(after_fence);
        if let Some(fence_end) = after_fence.find("```") {
            text = after_fence[..fence_end].trim();
        } else {
            text = after_fence.trim();
        }
    }

    let start = text.find('{').ok_or_else(|| LlmError::Permanent("no JSON object found in response".to_string()))?;
    let end = text.rfind('}').ok_or_else(|| LlmError::Permanent("no JSON object found in response".to_string()))?;
    if end < start {
        return Err(LlmError::Permanent("no JSON object found in response".to_string()));
    }

    serde_json::from_str(&text[start..=end]).map_err(|e| LlmError::Permanent(format!("malformed JSON in response: {e}")))
}

/// Normalize a CUIT extracted from model output: strip `-`, space, `/`, and
/// validate the checksum.
pub fn normalize_and_validate_cuit(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| *c != '-' && *c != ' ' && *c != '/').collect();
    let digits = normalize_cuit(&cleaned);
    if is_valid_cuit(&digits) {
        Some(digits)
    } else {
        None
    }
}

fn adva_pattern_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "ASOC...CIVIL...DESARROLL" with anything in between, tolerant of OCR
    // mangling of the tail (e.g. "DESARROLLARODES" for "DESARROLLO DE ...").
    RE.get_or_init(|| Regex::new(r"(?i)ASOC.*CIVIL.*DESARROLL").unwrap())
}

/// Does `name` refer to the reference organization? Matches the literal
/// "ADVA", the long-form association name (OCR-tolerant), or the
/// "VIDEOJUEGO" (video game) activity marker that appears in its filings.
pub fn is_adva_name(name: &str) -> bool {
    let upper = name.to_uppercase();
    if upper.split(|c: char| !c.is_alphanumeric()).any(|tok| tok == "ADVA") {
        return true;
    }
    if adva_pattern_re().is_match(&upper) {
        return true;
    }
    upper.contains("VIDEOJUEGO")
}

/// Given the issuer/receiver names extracted from an invoice and the set of
/// CUITs found in it, decide the document's direction and assign CUITs to
/// each side (§4.5).
pub fn assign_invoice_direction(
    name_issuer: &str,
    name_receiver: &str,
    cuits: &[String],
) -> Result<(Direction, String, String), LlmError> {
    let valid_cuits: Vec<String> = cuits.iter().filter(|c| is_valid_cuit(c)).map(|c| normalize_cuit(c)).collect();
    let non_adva: Vec<&String> = valid_cuits.iter().filter(|c| c.as_str() != ADVA_CUIT).collect();

    let issuer_is_adva = is_adva_name(name_issuer);
    let receiver_is_adva = is_adva_name(name_receiver);

    if issuer_is_adva && !receiver_is_adva {
        if valid_cuits.len() <= 1 {
            return Ok((Direction::FacturaEmitida, ADVA_CUIT.to_string(), String::new()));
        }
        let receptor = non_adva.first().map(|s| s.to_string()).unwrap_or_default();
        return Ok((Direction::FacturaEmitida, ADVA_CUIT.to_string(), receptor));
    }

    if receiver_is_adva && !issuer_is_adva {
        let emisor = non_adva.first().map(|s| s.to_string()).unwrap_or_default();
        return Ok((Direction::FacturaRecibida, emisor, ADVA_CUIT.to_string()));
    }

    Err(LlmError::Permanent(format!(
        "cannot determine direction: issuer={name_issuer:?} receiver={name_receiver:?}"
    )))
}

/// `presentRequiredFields / totalRequiredFields`, floored at 0.5 and
/// ceiled at 1.0 (§4.5).
pub fn compute_confidence(present_required: usize, total_required: usize) -> f64 {
    if total_required == 0 {
        return 1.0;
    }
    (present_required as f64 / total_required as f64).clamp(0.5, 1.0)
}

/// `needsReview` per §4.5: low confidence plus either a missing required
/// field or a suspicious empty optional one.
pub fn needs_review(confidence: f64, any_required_missing: bool, suspicious_empty_optional: bool) -> bool {
    confidence <= 0.9 && (any_required_missing || suspicious_empty_optional)
}
