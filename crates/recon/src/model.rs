//! Shared types for the bank-movement tier matcher (§4.9) and the
//! reconciliation orchestrator (§4.10).

use adva_core::{FileId, MatchConfidence};

/// Tier 1 (strongest) through 5 (amount+date only), per §4.9 Phase 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    T1PagoFacturaLink,
    T2CuitIdentity,
    T3RefIdentity,
    T4Keyword,
    T5AmountDateOnly,
}

impl Tier {
    pub fn confidence(self, cross_currency: bool) -> MatchConfidence {
        match self {
            Tier::T1PagoFacturaLink | Tier::T2CuitIdentity | Tier::T3RefIdentity => {
                if cross_currency { MatchConfidence::Medium } else { MatchConfidence::High }
            }
            Tier::T4Keyword => {
                if cross_currency { MatchConfidence::Low } else { MatchConfidence::Medium }
            }
            Tier::T5AmountDateOnly => MatchConfidence::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    BankFee,
    CreditCardPayment,
    PagoFactura,
    DirectFactura,
    Recibo,
    PagoOnly,
    NoMatch,
}

/// Outcome of matching one bank movement (§4.9 "Output").
#[derive(Debug, Clone)]
pub struct MovementMatch {
    pub match_type: MatchType,
    pub description: String,
    pub matched_file_id: Option<FileId>,
    pub extracted_cuit: Option<String>,
    pub confidence: Option<MatchConfidence>,
    pub tier: Option<Tier>,
    pub reasons: Vec<String>,
}

impl MovementMatch {
    pub fn no_match() -> Self {
        Self {
            match_type: MatchType::NoMatch,
            description: String::new(),
            matched_file_id: None,
            extracted_cuit: None,
            confidence: None,
            tier: None,
            reasons: vec!["no candidate survived the hard identity filter or date/amount checks".to_string()],
        }
    }

    pub fn phase0(description: &str, reason: &str) -> Self {
        Self {
            match_type: if description == "Gastos bancarios" { MatchType::BankFee } else { MatchType::CreditCardPayment },
            description: description.to_string(),
            matched_file_id: None,
            extracted_cuit: None,
            confidence: Some(MatchConfidence::High),
            tier: None,
            reasons: vec![reason.to_string()],
        }
    }
}

/// An internal scored candidate before tier assignment and ranking.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub file_id: FileId,
    pub tier: Tier,
    pub date_diff_days: i64,
    pub is_exact_amount: bool,
    pub cross_currency: bool,
    pub used_retenciones: Vec<FileId>,
    pub reason: String,
}

pub(crate) fn best_candidate(mut candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then(a.date_diff_days.abs().cmp(&b.date_diff_days.abs()))
            .then(b.is_exact_amount.cmp(&a.is_exact_amount))
    });
    candidates.into_iter().next()
}
