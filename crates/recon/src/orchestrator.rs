//! Reconciliation orchestrator (§4.10): re-runs §4.7/§4.8 over unmatched
//! rows after each scan batch, displacing weaker existing matches when a
//! better candidate appears, and cascading onto the freed counterpart.

use adva_core::{FileId, Invoice, MatchConfidence, Payment, Receipt};

use crate::amount_match::RateLookup;
use crate::invoice_payment;
use crate::receipt_payment::{self, ReceiptCandidate};

pub const MAX_CASCADE_DEPTH: u32 = 10;
pub const CASCADE_TIMEOUT_MS: u64 = 30_000;

impl RateLookup for &adva_store::ExchangeRateCache {
    fn venta_rate(&self, date: chrono::NaiveDate) -> Option<f64> {
        self.venta_rate(date).ok()
    }
}

/// One displacement decision: link `payment` to `invoice`, optionally
/// freeing a previous counterpart on either side.
#[derive(Debug, Clone)]
pub struct Displacement {
    pub payment_file_id: FileId,
    pub invoice_file_id: FileId,
    pub confidence: MatchConfidence,
    pub freed_invoice_file_id: Option<FileId>,
    pub freed_payment_file_id: Option<FileId>,
}

/// `true` if `candidate` should replace the payment's existing match, per
/// the general replacement comparator (§4.10): here expressed over
/// confidence tiers (HIGH/MEDIUM/LOW) since §4.7/§4.8 candidates don't carry
/// a numeric tier the way bank-movement candidates do.
fn is_strict_upgrade(candidate_confidence: MatchConfidence, existing_confidence: Option<MatchConfidence>) -> bool {
    match existing_confidence {
        None => true,
        Some(existing) => candidate_confidence > existing,
    }
}

/// Score one payment against the invoice pool and decide whether it should
/// (dis)place an existing match. A payment links to at most one invoice, so
/// this produces at most one [`Displacement`]; the caller is the cascade
/// driver, re-invoking this for the freed counterpart (`freed_invoice_file_id`'s
/// previous payment, if any) up to `MAX_CASCADE_DEPTH` steps or until
/// `CASCADE_TIMEOUT_MS` elapses (§4.10) — the depth/time budget bounds how
/// many times the *driver* calls this function for one batch, not this
/// function's own work.
pub fn cascade_invoice_payment(payment: &Payment, invoices: &[&Invoice], rates: &dyn RateLookup, low_days_before: i64, low_days_after: i64, tolerance_pct: f64) -> Option<Displacement> {
    let best = invoice_payment::find_candidates(payment, invoices, rates, low_days_before, low_days_after, tolerance_pct).into_iter().next()?;
    if !is_strict_upgrade(best.confidence, payment.match_confidence) {
        return None;
    }

    let freed_invoice = if best.is_upgrade { find_invoice_current_match(invoices, &best.file_id) } else { None };

    Some(Displacement {
        payment_file_id: payment.meta.file_id.clone(),
        invoice_file_id: best.file_id,
        confidence: best.confidence,
        freed_invoice_file_id: freed_invoice,
        freed_payment_file_id: None,
    })
}

fn find_invoice_current_match(invoices: &[&Invoice], invoice_id: &FileId) -> Option<FileId> {
    invoices
        .iter()
        .find(|inv| &inv.meta.file_id == invoice_id)
        .and_then(|inv| inv.matched_pago_file_id.clone())
}

#[derive(Debug, Clone)]
pub struct ReceiptDisplacement {
    pub payment_file_id: FileId,
    pub receipt_file_id: FileId,
    pub confidence: MatchConfidence,
}

pub fn best_receipt_match(payment: &Payment, receipts: &[&Receipt], rates: &dyn RateLookup, low_days_before: i64, low_days_after: i64, tolerance_pct: f64) -> Option<ReceiptDisplacement> {
    let candidates: Vec<ReceiptCandidate> = receipt_payment::find_candidates(payment, receipts, rates, low_days_before, low_days_after, tolerance_pct);
    let best = candidates.into_iter().next()?;
    if !is_strict_upgrade(best.confidence, payment.match_confidence) {
        return None;
    }
    Some(ReceiptDisplacement { payment_file_id: payment.meta.file_id.clone(), receipt_file_id: best.file_id, confidence: best.confidence })
}

/// General replacement comparator for bank-movement candidates (§4.10):
/// lower tier wins; then closer date; then exact beats tolerance; otherwise
/// keep the existing match (no churn).
pub fn bank_replacement_wins(cand_tier: crate::model::Tier, cand_date_dist: i64, cand_is_exact: bool, existing_tier: crate::model::Tier, existing_date_dist: i64, existing_is_exact: bool) -> bool {
    if cand_tier != existing_tier {
        return cand_tier < existing_tier;
    }
    if cand_date_dist != existing_date_dist {
        return cand_date_dist.abs() < existing_date_dist.abs();
    }
    if cand_is_exact != existing_is_exact {
        return cand_is_exact;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use adva_core::{Amount, Currency, FileId, InvoiceType, RecordMeta};

    struct FixedRate(f64);
    impl RateLookup for FixedRate {
        fn venta_rate(&self, _date: chrono::NaiveDate) -> Option<f64> {
            Some(self.0)
        }
    }

    fn meta(id: &str) -> RecordMeta {
        RecordMeta { file_id: FileId::new(id), file_name: format!("{id}.pdf"), processed_at: chrono::Utc::now(), confidence: 1.0, needs_review: false }
    }

    fn invoice(id: &str, fecha: &str, total_cents: i64, cuit_emisor: &str, matched: Option<&str>) -> Invoice {
        Invoice {
            meta: meta(id),
            tipo_comprobante: InvoiceType::A,
            nro_factura: "0001-00000001".into(),
            fecha_emision: chrono::NaiveDate::parse_from_str(fecha, "%Y-%m-%d").unwrap(),
            cuit_emisor: cuit_emisor.into(),
            razon_social_emisor: "Proveedor SA".into(),
            cuit_receptor: None,
            razon_social_receptor: None,
            importe_neto: Amount::from_cents(total_cents),
            importe_iva: Amount::ZERO,
            importe_total: Amount::from_cents(total_cents),
            moneda: Currency::ARS,
            concepto: None,
            matched_pago_file_id: matched.map(FileId::new),
            match_confidence: matched.map(|_| MatchConfidence::Low),
        }
    }

    fn payment(id: &str, fecha: &str, amount_cents: i64, beneficiario_cuit: Option<&str>) -> Payment {
        Payment {
            meta: meta(id),
            banco: "Galicia".into(),
            fecha_pago: chrono::NaiveDate::parse_from_str(fecha, "%Y-%m-%d").unwrap(),
            importe_pagado: Amount::from_cents(amount_cents),
            moneda: Currency::ARS,
            referencia: None,
            cuit_pagador: None,
            nombre_pagador: None,
            cuit_beneficiario: beneficiario_cuit.map(String::from),
            nombre_beneficiario: None,
            concepto: None,
            matched_factura_file_id: None,
            match_confidence: None,
        }
    }

    #[test]
    fn unmatched_payment_links_to_best_invoice() {
        let inv = invoice("f1", "2025-06-01", 100_000, "20123456786", None);
        let pay = payment("p1", "2025-06-05", 100_000, Some("20123456786"));
        let out = cascade_invoice_payment(&pay, &[&inv], &FixedRate(0.0), 10, 60, 5.0).expect("should match");
        assert_eq!(out.invoice_file_id, FileId::new("f1"));
        assert!(out.freed_invoice_file_id.is_none());
    }

    #[test]
    fn displaces_weaker_existing_match_and_frees_it() {
        let inv = invoice("f1", "2025-06-01", 100_000, "20123456786", Some("old-payment"));
        let pay = payment("p1", "2025-06-05", 100_000, Some("20123456786"));
        let out = cascade_invoice_payment(&pay, &[&inv], &FixedRate(0.0), 10, 60, 5.0).expect("should match");
        assert_eq!(out.freed_invoice_file_id, Some(FileId::new("old-payment")));
    }

    #[test]
    fn does_not_displace_when_existing_confidence_already_as_good() {
        let mut pay = payment("p1", "2025-06-05", 100_000, None); // no identity -> MEDIUM at best
        pay.match_confidence = Some(MatchConfidence::High);
        let inv = invoice("f1", "2025-06-01", 100_000, "20123456786", None);
        let out = cascade_invoice_payment(&pay, &[&inv], &FixedRate(0.0), 10, 60, 5.0);
        assert!(out.is_none());
    }

    #[test]
    fn bank_replacement_comparator_prefers_lower_tier() {
        use crate::model::Tier;
        assert!(bank_replacement_wins(Tier::T2CuitIdentity, 5, false, Tier::T4Keyword, 0, true));
        assert!(!bank_replacement_wins(Tier::T4Keyword, 0, true, Tier::T2CuitIdentity, 5, false));
    }

    #[test]
    fn bank_replacement_comparator_no_churn_on_tie() {
        use crate::model::Tier;
        assert!(!bank_replacement_wins(Tier::T2CuitIdentity, 3, true, Tier::T2CuitIdentity, 3, true));
    }
}
