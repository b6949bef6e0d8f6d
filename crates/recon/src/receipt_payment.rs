//! Receipt <-> Payment matcher (§4.8). Shares date windows and ordering with
//! the invoice matcher; differs in the compared amount (totalNeto) and in
//! restricting the identity signal to the beneficiary side only.

use adva_core::dates::{day_distance, within_open_window, within_window};
use adva_core::{FileId, MatchConfidence, Payment, Receipt};

use crate::amount_match::{amounts_match, is_cross_currency, RateLookup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateWindow {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone)]
pub struct ReceiptCandidate {
    pub file_id: FileId,
    pub confidence: MatchConfidence,
    pub date_diff_days: i64,
    pub exact_amount: bool,
}

/// Beneficiary-only identity check: a payment's payer is never a signal
/// here, only who it was paid to (§4.8).
fn identity_hit(payment: &Payment, receipt: &Receipt) -> bool {
    if let Some(ref beneficiario) = payment.cuit_beneficiario {
        if adva_core::cuit_or_dni_match(beneficiario, &receipt.cuil_empleado) {
            return true;
        }
    }
    let nombre = receipt.nombre_empleado.to_uppercase();
    if nombre.is_empty() {
        return false;
    }
    if let Some(ref beneficiario_nombre) = payment.nombre_beneficiario {
        let b = beneficiario_nombre.to_uppercase();
        if !b.is_empty() && (nombre.contains(&b) || b.contains(&nombre)) {
            return true;
        }
    }
    false
}

/// See `invoice_payment::classify_window`: LOW is written `(-10, +60)` with
/// open parens, so both configured bounds are excluded.
fn classify_window(receipt_date: chrono::NaiveDate, payment_date: chrono::NaiveDate, low_days_before: i64, low_days_after: i64) -> Option<DateWindow> {
    if within_window(receipt_date, payment_date, 0, 15) {
        Some(DateWindow::High)
    } else if within_open_window(receipt_date, payment_date, -3, 30) {
        Some(DateWindow::Medium)
    } else if within_open_window(receipt_date, payment_date, -low_days_before, low_days_after) {
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

pub fn find_candidates(payment: &Payment, receipts: &[&Receipt], rates: &dyn RateLookup, low_days_before: i64, low_days_after: i64, tolerance_pct: f64) -> Vec<ReceiptCandidate> {
    let mut out = Vec::new();

    for receipt in receipts {
        let window = match classify_window(receipt.fecha_pago, payment.fecha_pago, low_days_before, low_days_after) {
            Some(w) => w,
            None => continue,
        };

        // Receipts carry no currency field distinct from ARS; payments in a
        // foreign currency never match a payroll receipt.
        let cross_currency = is_cross_currency(adva_core::Currency::ARS, payment.moneda);
        let amount_ok = match amounts_match(
            receipt.total_neto,
            adva_core::Currency::ARS,
            payment.importe_pagado,
            payment.moneda,
            receipt.fecha_pago,
            rates,
            tolerance_pct,
        ) {
            Some(ok) => ok,
            None => continue,
        };
        if !amount_ok {
            continue;
        }

        let identity = identity_hit(payment, receipt);
        let mut confidence = base_confidence(window, identity);
        if cross_currency {
            confidence = if identity { confidence.min(MatchConfidence::Medium) } else { MatchConfidence::Low };
        }

        out.push(ReceiptCandidate {
            file_id: receipt.meta.file_id.clone(),
            confidence,
            date_diff_days: day_distance(receipt.fecha_pago, payment.fecha_pago).abs(),
            exact_amount: receipt.total_neto.approx_eq(&payment.importe_pagado, 0) && !cross_currency,
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
