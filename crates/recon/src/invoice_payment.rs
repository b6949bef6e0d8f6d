//! Invoice <-> Payment matcher (§4.7).

use adva_core::dates::{day_distance, within_open_window, within_window};
use adva_core::{FileId, Invoice, MatchConfidence, Payment};

use crate::amount_match::{amounts_match, is_cross_currency, RateLookup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateWindow {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone)]
pub struct InvoiceCandidate {
    pub file_id: FileId,
    pub confidence: MatchConfidence,
    pub date_diff_days: i64,
    pub exact_amount: bool,
    /// `true` if this invoice already has a (weaker) match; the orchestrator
    /// may displace it (§4.10).
    pub is_upgrade: bool,
}

/// CUIT/DNI identity hit: beneficiary takes precedence over payer (§4.7).
fn identity_hit(payment: &Payment, invoice: &Invoice) -> bool {
    if let Some(ref beneficiario) = payment.cuit_beneficiario {
        if adva_core::cuit_or_dni_match(beneficiario, &invoice.cuit_emisor) {
            return true;
        }
    }
    if let Some(ref pagador) = payment.cuit_pagador {
        if adva_core::cuit_or_dni_match(pagador, &invoice.cuit_emisor) {
            return true;
        }
    }
    let razon = invoice.razon_social_emisor.to_uppercase();
    if razon.is_empty() {
        return false;
    }
    for name in [&payment.nombre_beneficiario, &payment.nombre_pagador].into_iter().flatten() {
        let name_upper = name.to_uppercase();
        if name_upper.is_empty() {
            continue;
        }
        if razon.contains(&name_upper) || name_upper.contains(&razon) {
            return true;
        }
    }
    false
}

/// `low_days_before`/`low_days_after` are the configured LOW-window bounds
/// (§6's `match_days_before`/`match_days_after`); HIGH and MEDIUM are fixed
/// by the spec. LOW is written `(-10, +60)` with open parens, so both ends
/// are excluded, same as MEDIUM.
fn classify_window(invoice_date: chrono::NaiveDate, payment_date: chrono::NaiveDate, low_days_before: i64, low_days_after: i64) -> Option<DateWindow> {
    if within_window(invoice_date, payment_date, 0, 15) {
        Some(DateWindow::High)
    } else if within_open_window(invoice_date, payment_date, -3, 30) {
        Some(DateWindow::Medium)
    } else if within_open_window(invoice_date, payment_date, -low_days_before, low_days_after) {
        Some(DateWindow::Low)
    } else {
        None
    }
}

fn base_confidence(window: DateWindow, identity: bool) -> MatchConfidence {
    match (window, identity) {
        (DateWindow::High, true) => MatchConfidence::High,
        (DateWindow::High, false) => MatchConfidence::Medium,
        (DateWindow::Medium, _) => MatchConfidence::Medium,
        (DateWindow::Low, true) => MatchConfidence::Medium,
        (DateWindow::Low, false) => MatchConfidence::Low,
    }
}

/// Score one payment against a pool of candidate invoices (which may
/// include already-matched invoices, surfaced with `is_upgrade = true`).
/// `low_days_before`/`low_days_after`/`tolerance_pct` come from
/// `PipelineConfig` (§6).
pub fn find_candidates(payment: &Payment, invoices: &[&Invoice], rates: &dyn RateLookup, low_days_before: i64, low_days_after: i64, tolerance_pct: f64) -> Vec<InvoiceCandidate> {
    let mut out = Vec::new();

    for invoice in invoices {
        let window = match classify_window(invoice.fecha_emision, payment.fecha_pago, low_days_before, low_days_after) {
            Some(w) => w,
            None => continue,
        };

        let cross_currency = is_cross_currency(invoice.moneda, payment.moneda);
        let amount_ok = match amounts_match(
            invoice.importe_total,
            invoice.moneda,
            payment.importe_pagado,
            payment.moneda,
            invoice.fecha_emision,
            rates,
            tolerance_pct,
        ) {
            Some(ok) => ok,
            None => continue, // rate unavailable for cross-currency: reject
        };
        if !amount_ok {
            continue;
        }

        let identity = identity_hit(payment, invoice);
        let mut confidence = base_confidence(window, identity);
        if cross_currency {
            confidence = if identity { confidence.min(MatchConfidence::Medium) } else { MatchConfidence::Low };
        }

        out.push(InvoiceCandidate {
            file_id: invoice.meta.file_id.clone(),
            confidence,
            date_diff_days: day_distance(invoice.fecha_emision, payment.fecha_pago).abs(),
            exact_amount: invoice.importe_total.approx_eq(&payment.importe_pagado, 0) && !cross_currency,
            is_upgrade: invoice.matched_pago_file_id.is_some(),
        });
    }

    out.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then(a.date_diff_days.cmp(&b.date_diff_days))
            .then(b.exact_amount.cmp(&a.exact_amount))
    });

    out
}
