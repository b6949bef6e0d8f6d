//! Concepto parsing for the bank-movement matcher: bank-origin prefix
//! stripping, identity extraction, and keyword tokenization (§4.9 Phase 1).

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

const JARGON: &[&str] = &[
    "DEBITO", "CREDITO", "TRANSFERENCIA", "TRANSFERENCI", "PAGO", "COBRO", "OG", "DI", "AUT",
    "AUTO", "DIR", "REF", "NRO", "NUM", "CTA", "CBU",
];

fn bank_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^D\s+\d{2,3}\s+").unwrap())
}

fn ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{7})\.\d{2}\.\d{4}").unwrap())
}

/// Strip an optional `"D ddd "` bank-origin prefix from the start of a
/// concepto string, as done before both Phase 0 matching and tokenization.
pub fn strip_bank_prefix(concepto: &str) -> &str {
    match bank_prefix_re().find(concepto) {
        Some(m) => &concepto[m.end()..],
        None => concepto,
    }
}

/// First 7-digit ORDEN-DE-PAGO reference embedded as `ddddddd.dd.dddd`.
pub fn extract_ref(concepto: &str) -> Option<String> {
    ref_re().captures(concepto).map(|c| c[1].to_string())
}

fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !unicode_normalization::char::is_combining_mark(*c)).collect()
}

/// Token extraction for keyword scoring (§4.9 Phase 1, steps 1-5).
pub fn name_tokens(concepto: &str) -> Vec<String> {
    let stripped = strip_bank_prefix(concepto);
    let jargon: HashSet<&str> = JARGON.iter().copied().collect();

    let mut tokens = Vec::new();
    for part in stripped.split(|c: char| c.is_whitespace() || c == '-' || c == '.') {
        if part.is_empty() {
            continue;
        }
        for piece in split_digit_letter_boundaries(part) {
            let upper = strip_accents(&piece).to_uppercase();
            if upper.len() < 3 {
                continue;
            }
            if upper.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if jargon.contains(upper.as_str()) {
                continue;
            }
            tokens.push(upper);
        }
    }
    tokens
}

fn split_digit_letter_boundaries(part: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_kind: Option<bool> = None; // Some(true) = digit, Some(false) = letter/other
    for c in part.chars() {
        let kind = c.is_ascii_digit();
        if let Some(prev) = prev_kind {
            if prev != kind && (c.is_ascii_digit() || c.is_alphabetic()) {
                out.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
        prev_kind = Some(kind);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn contains_word(haystack_upper: &str, token: &str) -> bool {
    haystack_upper
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == token)
}

/// Keyword score of `tokens` against an entity name and optional concepto
/// field (§4.9 Phase 1): +2 per whole-word hit in each.
pub fn keyword_score(tokens: &[String], entity_name: &str, concepto_field: Option<&str>) -> i32 {
    let entity_upper = strip_accents(entity_name).to_uppercase();
    let concepto_upper = concepto_field.map(|c| strip_accents(c).to_uppercase());

    let mut score = 0;
    for token in tokens {
        if contains_word(&entity_upper, token) {
            score += 2;
        }
        if let Some(ref c) = concepto_upper {
            if contains_word(c, token) {
                score += 2;
            }
        }
    }
    score
}

pub const MIN_USABLE_KEYWORD_SCORE: i32 = 2;
