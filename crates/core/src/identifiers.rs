//! CUIT/CUIL/DNI validation and extraction (§4.1).

use regex::Regex;
use std::sync::OnceLock;

const CUIT_WEIGHTS: [u32; 10] = [5, 4, 3, 2, 7, 6, 5, 4, 3, 2];
const VALID_PREFIXES: [&str; 7] = ["20", "23", "24", "27", "30", "33", "34"];

/// Strip the separators a CUIT is commonly rendered with (`-`, space, `/`).
pub fn normalize_cuit(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validate a CUIT/CUIL: 11 digits, known type prefix, mod-11 checksum.
pub fn is_valid_cuit(raw: &str) -> bool {
    let digits = normalize_cuit(raw);
    if digits.len() != 11 {
        return false;
    }
    if !VALID_PREFIXES.contains(&&digits[0..2]) {
        return false;
    }
    let nums: Vec<u32> = digits.chars().map(|c| c.to_digit(10).unwrap()).collect();
    let sum: u32 = nums[0..10]
        .iter()
        .zip(CUIT_WEIGHTS.iter())
        .map(|(d, w)| d * w)
        .sum();
    let c = 11 - (sum % 11);
    let expected = match c {
        11 => 0,
        10 => 9,
        other => other,
    };
    expected == nums[10]
}

/// Format a normalized 11-digit CUIT as `NN-NNNNNNNN-N`.
pub fn format_cuit(raw: &str) -> String {
    let digits = normalize_cuit(raw);
    if digits.len() != 11 {
        return digits;
    }
    format!("{}-{}-{}", &digits[0..2], &digits[2..10], &digits[10..11])
}

/// A DNI is 7-8 digits and sits at positions 2..10 of the CUIT that embeds it.
pub fn is_valid_dni(raw: &str) -> bool {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    matches!(digits.len(), 7 | 8)
}

/// Two identifiers match if both are equal CUITs, or if one is a DNI that is
/// textually embedded in the other's CUIT at positions 2..10 (§4.1).
pub fn cuit_or_dni_match(a: &str, b: &str) -> bool {
    let na = normalize_cuit(a);
    let nb = normalize_cuit(b);

    if na.len() == 11 && nb.len() == 11 {
        return na == nb;
    }

    let (cuit, dni) = if na.len() == 11 {
        (Some(&na), &nb)
    } else if nb.len() == 11 {
        (Some(&nb), &na)
    } else {
        (None, &na)
    };

    let Some(cuit) = cuit else {
        return false;
    };
    if !matches!(dni.len(), 7 | 8) {
        return false;
    }
    let embedded = &cuit[2..10];
    let embedded_trimmed = embedded.trim_start_matches('0');
    let dni_trimmed = dni.trim_start_matches('0');
    embedded_trimmed == dni_trimmed
}

/// Extract the DNI embedded in a valid CUIT (positions 2..10, leading zeros
/// stripped). Returns `None` if `cuit` is not 11 digits.
pub fn extract_dni_from_cuit(cuit: &str) -> Option<String> {
    let digits = normalize_cuit(cuit);
    if digits.len() != 11 {
        return None;
    }
    let embedded = digits[2..10].trim_start_matches('0');
    Some(if embedded.is_empty() { "0".to_string() } else { embedded.to_string() })
}

fn labeled_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)CUI[TL][:\s]*(\d{2}[-\s]?\d{8}[-\s]?\d)").unwrap())
}

fn separated_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2})[-\s](\d{8})[-\s](\d)").unwrap())
}

fn plain_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{11}").unwrap())
}

/// Extract the first checksum-valid CUIT from free text, trying labeled,
/// separated, then plain 11-digit-run patterns in order (§4.1).
pub fn extract_cuit(text: &str) -> Option<String> {
    if let Some(caps) = labeled_re().captures(text) {
        let candidate = normalize_cuit(&caps[1]);
        if is_valid_cuit(&candidate) {
            return Some(candidate);
        }
    }
    if let Some(caps) = separated_re().captures(text) {
        let candidate = format!("{}{}{}", &caps[1], &caps[2], &caps[3]);
        if is_valid_cuit(&candidate) {
            return Some(candidate);
        }
    }
    for m in plain_re().find_iter(text) {
        if is_valid_cuit(m.as_str()) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    // 30-70907678-3 is the ADVA CUIT used throughout the spec.
    const ADVA: &str = "30709076783";

    #[test]
    fn valid_cuit_checksum() {
        assert!(is_valid_cuit(ADVA));
        assert!(is_valid_cuit("30-70907678-3"));
    }

    #[test]
    fn invalid_checksum_rejected() {
        assert!(!is_valid_cuit("30709076780"));
    }

    #[test]
    fn invalid_prefix_rejected() {
        // 99 is not a recognized type prefix even if checksum matched by chance.
        assert!(!is_valid_cuit("99709076783"));
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(!is_valid_cuit("123"));
    }

    #[test]
    fn format_roundtrip() {
        assert_eq!(format_cuit(ADVA), "30-70907678-3");
        assert!(is_valid_cuit(&format_cuit(ADVA)));
    }

    #[test]
    fn dni_embedded_in_cuit_matches() {
        let dni = extract_dni_from_cuit(ADVA).unwrap();
        assert!(cuit_or_dni_match(ADVA, &dni));
        assert!(cuit_or_dni_match(&dni, ADVA));
    }

    #[test]
    fn two_cuits_match_only_if_equal() {
        assert!(cuit_or_dni_match(ADVA, ADVA));
        assert!(!cuit_or_dni_match(ADVA, "20123456786"));
    }

    #[test]
    fn extract_labeled_cuit() {
        let text = "Emisor CUIT: 30-70907678-3 domicilio...";
        assert_eq!(extract_cuit(text).as_deref(), Some(ADVA));
    }

    #[test]
    fn extract_separated_cuit() {
        let text = "identificador 30-70907678-3 fin";
        assert_eq!(extract_cuit(text).as_deref(), Some(ADVA));
    }

    #[test]
    fn extract_plain_run_cuit() {
        let text = "varios numeros 30709076783 aqui";
        assert_eq!(extract_cuit(text).as_deref(), Some(ADVA));
    }

    #[test]
    fn extract_skips_invalid_candidates() {
        // first run fails checksum, second is valid
        let text = "00000000000 y tambien 30709076783";
        assert_eq!(extract_cuit(text).as_deref(), Some(ADVA));
    }

    #[test]
    fn extract_none_when_absent() {
        assert_eq!(extract_cuit("no identifiers here"), None);
    }
}
