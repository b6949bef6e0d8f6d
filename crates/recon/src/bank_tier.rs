//! Bank-movement tier matcher (§4.9), the core reconciliation algorithm:
//! debit movements match against invoices-received/payments-sent/receipts,
//! credit movements against invoices-issued/payments-received (adjusted by
//! withholdings).

use std::sync::OnceLock;

use adva_core::dates::{day_distance, within_window};
use adva_core::{extract_cuit, BankMovement, FileId, Invoice, Payment, Receipt, Withholding};
use regex::Regex;

use crate::amount_match::{amounts_match, is_cross_currency, RateLookup};
use crate::concepto::{extract_ref, keyword_score, name_tokens, strip_bank_prefix, MIN_USABLE_KEYWORD_SCORE};
use crate::model::{best_candidate, Candidate, MatchType, MovementMatch, Tier};

pub struct DebitPools<'a> {
    pub invoices_received: &'a [Invoice],
    pub payments_sent: &'a [Payment],
    pub receipts: &'a [Receipt],
}

pub struct CreditPools<'a> {
    pub invoices_issued: &'a [Invoice],
    pub payments_received: &'a [Payment],
    pub withholdings: &'a [Withholding],
}

fn bank_fee_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(IMPUESTO LEY|IMP\.LEY 25413|LEY NRO 25\.4|COMISION|COM MANT|COMI TRANSFERENCIA|COM\.TRANSF|IVA TASA|GP-COM\.OPAGO|GP-IVA TASA)",
        )
        .unwrap()
    })
}

fn card_payment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^PAGO TARJETA\s*(\d|VISA|MASTERCARD|AMEX|NARANJA|CABAL)").unwrap())
}

/// Phase 0: auto-recognized patterns short-circuit the whole matcher.
fn phase0(movement: &BankMovement) -> Option<MovementMatch> {
    let stripped = strip_bank_prefix(&movement.concepto);
    if bank_fee_re().is_match(stripped) {
        return Some(MovementMatch::phase0("Gastos bancarios", "concepto matches a bank-fee pattern"));
    }
    if movement.is_credit() {
        return None; // credit_card_payment only applies to debit movements
    }
    if card_payment_re().is_match(stripped) {
        return Some(MovementMatch::phase0("Pago de tarjeta de credito", "concepto matches credit-card payment pattern"));
    }
    None
}

struct Identity {
    extracted_cuit: Option<String>,
    extracted_ref: Option<String>,
    tokens: Vec<String>,
}

fn extract_identity(concepto: &str) -> Identity {
    Identity { extracted_cuit: extract_cuit(concepto), extracted_ref: extract_ref(concepto), tokens: name_tokens(concepto) }
}

fn description(match_type: MatchType, is_credit: bool, razon_emisor: Option<&str>, razon_receptor: Option<&str>, concepto: Option<&str>, con_retencion: bool) -> String {
    match match_type {
        MatchType::BankFee => "Gastos bancarios".to_string(),
        MatchType::CreditCardPayment => "Pago de tarjeta de credito".to_string(),
        MatchType::PagoFactura | MatchType::DirectFactura => {
            let base = if is_credit {
                format!("Cobro Factura de {} - {}", razon_receptor.unwrap_or_default(), concepto.unwrap_or_default())
            } else {
                format!("Pago Factura a {} - {}", razon_emisor.unwrap_or_default(), concepto.unwrap_or_default())
            };
            if match_type == MatchType::DirectFactura && con_retencion {
                format!("{base} (con retencion)")
            } else {
                base
            }
        }
        MatchType::Recibo => String::new(), // filled by caller with periodo/nombre
        MatchType::PagoOnly => String::new(), // filled by caller
        MatchType::NoMatch => String::new(),
    }
}

/// Match a debit movement (Egresos pool): invoices-received, payments-sent,
/// receipts. `tolerance_pct` is §6's `usd_ars_tolerance_percent`.
pub fn match_debit(movement: &BankMovement, pools: &DebitPools, rates: &dyn RateLookup, tolerance_pct: f64) -> MovementMatch {
    if let Some(m) = phase0(movement) {
        return m;
    }
    let identity = extract_identity(&movement.concepto);
    let amount = movement.amount();

    let mut candidates = Vec::new();

    // Tier 1: payments already linked to a candidate invoice.
    for payment in pools.payments_sent {
        let Some(ref linked) = payment.matched_factura_file_id else { continue };
        if !pools.invoices_received.iter().any(|inv| &inv.meta.file_id == linked) {
            continue;
        }
        if !within_window(movement.fecha, payment.fecha_pago, -15, 15) {
            continue;
        }
        if identity.extracted_cuit.is_some() && payment.cuit_beneficiario.as_deref() != identity.extracted_cuit.as_deref() && payment.cuit_pagador.as_deref() != identity.extracted_cuit.as_deref() {
            continue;
        }
        let Some(ok) = amounts_match(payment.importe_pagado, payment.moneda, amount, adva_core::Currency::ARS, payment.fecha_pago, rates, tolerance_pct) else { continue };
        if !ok {
            continue;
        }
        candidates.push(Candidate {
            file_id: linked.clone(),
            tier: Tier::T1PagoFacturaLink,
            date_diff_days: day_distance(movement.fecha, payment.fecha_pago),
            is_exact_amount: payment.importe_pagado.approx_eq(&amount, 0),
            cross_currency: is_cross_currency(payment.moneda, adva_core::Currency::ARS),
            used_retenciones: Vec::new(),
            reason: format!("payment {} already linked to this invoice", payment.meta.file_id),
        });
    }

    if candidates.is_empty() {
        gather_candidates_debit(movement, pools, &identity, rates, tolerance_pct, &mut candidates);
    }

    if identity.extracted_cuit.is_some() || identity.extracted_ref.is_some() {
        if candidates.is_empty() {
            return MovementMatch::no_match();
        }
    }

    let Some(winner) = best_candidate(candidates) else {
        return MovementMatch::no_match();
    };

    build_match_debit(movement, pools, &identity, winner)
}

fn gather_candidates_debit(movement: &BankMovement, pools: &DebitPools, identity: &Identity, rates: &dyn RateLookup, tolerance_pct: f64, out: &mut Vec<Candidate>) {
    let amount = movement.amount();

    for inv in pools.invoices_received {
        if identity.extracted_cuit.is_some() && Some(inv.cuit_emisor.as_str()) != identity.extracted_cuit.as_deref() {
            continue;
        }
        if identity.extracted_ref.is_some() {
            continue; // extractedRef only identifies Payment rows
        }
        if !within_window(inv.fecha_emision, movement.fecha, -5, 30) {
            continue;
        }
        let Some(ok) = amounts_match(inv.importe_total, inv.moneda, amount, adva_core::Currency::ARS, inv.fecha_emision, rates, tolerance_pct) else { continue };
        if !ok {
            continue;
        }
        let cross_currency = is_cross_currency(inv.moneda, adva_core::Currency::ARS);
        let tier = assign_identity_tier(identity, Some(&inv.cuit_emisor), None, &inv.razon_social_emisor, inv.concepto.as_deref());
        let Some(tier) = tier else { continue };
        out.push(Candidate {
            file_id: inv.meta.file_id.clone(),
            tier,
            date_diff_days: day_distance(inv.fecha_emision, movement.fecha),
            is_exact_amount: inv.importe_total.approx_eq(&amount, 0) && !cross_currency,
            cross_currency,
            used_retenciones: Vec::new(),
            reason: "invoice matched by amount/date/identity".to_string(),
        });
    }

    for payment in pools.payments_sent {
        if identity.extracted_cuit.is_some() {
            let hit = payment.cuit_beneficiario.as_deref() == identity.extracted_cuit.as_deref()
                || payment.cuit_pagador.as_deref() == identity.extracted_cuit.as_deref();
            if !hit {
                continue;
            }
        }
        if identity.extracted_ref.is_some() && payment.referencia.as_deref() != identity.extracted_ref.as_deref() {
            continue;
        }
        if !within_window(movement.fecha, payment.fecha_pago, -15, 15) {
            continue;
        }
        let Some(ok) = amounts_match(payment.importe_pagado, payment.moneda, amount, adva_core::Currency::ARS, payment.fecha_pago, rates, tolerance_pct) else { continue };
        if !ok {
            continue;
        }
        let cross_currency = is_cross_currency(payment.moneda, adva_core::Currency::ARS);
        let tier = assign_identity_tier(
            identity,
            payment.cuit_beneficiario.as_deref().or(payment.cuit_pagador.as_deref()),
            payment.referencia.as_deref(),
            payment.nombre_beneficiario.as_deref().unwrap_or_default(),
            None,
        );
        let Some(tier) = tier else { continue };
        out.push(Candidate {
            file_id: payment.meta.file_id.clone(),
            tier,
            date_diff_days: day_distance(movement.fecha, payment.fecha_pago),
            is_exact_amount: payment.importe_pagado.approx_eq(&amount, 0) && !cross_currency,
            cross_currency,
            used_retenciones: Vec::new(),
            reason: "payment matched by amount/date/identity".to_string(),
        });
    }

    for receipt in pools.receipts {
        if identity.extracted_cuit.is_some() && Some(receipt.cuil_empleado.as_str()) != identity.extracted_cuit.as_deref() {
            continue;
        }
        if identity.extracted_ref.is_some() {
            continue;
        }
        if !within_window(receipt.fecha_pago, movement.fecha, -5, 30) {
            continue;
        }
        let Some(ok) = amounts_match(receipt.total_neto, adva_core::Currency::ARS, amount, adva_core::Currency::ARS, receipt.fecha_pago, rates, tolerance_pct) else { continue };
        if !ok {
            continue;
        }
        let tier = assign_identity_tier(identity, Some(&receipt.cuil_empleado), None, &receipt.nombre_empleado, None);
        let Some(tier) = tier else { continue };
        out.push(Candidate {
            file_id: receipt.meta.file_id.clone(),
            tier,
            date_diff_days: day_distance(receipt.fecha_pago, movement.fecha),
            is_exact_amount: receipt.total_neto.approx_eq(&amount, 0),
            cross_currency: false,
            used_retenciones: Vec::new(),
            reason: "receipt matched by amount/date/identity".to_string(),
        });
    }
}

/// Phase 3 hard identity filter, folded into tier assignment: `None` means
/// the candidate fails the hard filter and must be dropped (no fallthrough).
fn assign_identity_tier(identity: &Identity, cuit_field: Option<&str>, ref_field: Option<&str>, entity_name: &str, concepto_field: Option<&str>) -> Option<Tier> {
    if let Some(ref extracted) = identity.extracted_cuit {
        return if cuit_field == Some(extracted.as_str()) { Some(Tier::T2CuitIdentity) } else { None };
    }
    if let Some(ref extracted) = identity.extracted_ref {
        return if ref_field == Some(extracted.as_str()) { Some(Tier::T3RefIdentity) } else { None };
    }
    let score = keyword_score(&identity.tokens, entity_name, concepto_field);
    if score >= MIN_USABLE_KEYWORD_SCORE {
        Some(Tier::T4Keyword)
    } else {
        Some(Tier::T5AmountDateOnly)
    }
}

fn build_match_debit(movement: &BankMovement, pools: &DebitPools, identity: &Identity, winner: Candidate) -> MovementMatch {
    if let Some(inv) = pools.invoices_received.iter().find(|i| i.meta.file_id == winner.file_id) {
        let match_type = if winner.tier == Tier::T1PagoFacturaLink { MatchType::PagoFactura } else { MatchType::DirectFactura };
        let desc = description(match_type, false, Some(inv.razon_social_emisor.as_str()), None, inv.concepto.as_deref(), false);
        return finish(match_type, desc, winner, identity);
    }
    if let Some(payment) = pools.payments_sent.iter().find(|p| p.meta.file_id == winner.file_id) {
        // A Payment standalone (no invoice link) is always flagged for
        // manual review, regardless of which tier confirmed it: we have no
        // underlying invoice to populate the usual templates from (§4.9).
        let nombre = payment.nombre_beneficiario.clone().unwrap_or_else(|| payment.nombre_pagador.clone().unwrap_or_default());
        let cuit = payment.cuit_beneficiario.clone().unwrap_or_else(|| payment.cuit_pagador.clone().unwrap_or_default());
        let desc = format!("REVISAR! Pago a {nombre} {cuit} ({})", payment.concepto.clone().unwrap_or_default());
        return finish(MatchType::PagoOnly, desc, winner, identity);
    }
    if let Some(receipt) = pools.receipts.iter().find(|r| r.meta.file_id == winner.file_id) {
        let desc = format!("Sueldo {} - {}", receipt.periodo_abonado, receipt.nombre_empleado);
        return finish(MatchType::Recibo, desc, winner, identity);
    }
    MovementMatch::no_match()
}

/// Match a credit movement (Ingresos pool): invoices-issued,
/// payments-received, withholdings as adjustment. `tolerance_pct` is §6's
/// `usd_ars_tolerance_percent`.
pub fn match_credit(movement: &BankMovement, pools: &CreditPools, rates: &dyn RateLookup, tolerance_pct: f64) -> MovementMatch {
    if let Some(m) = phase0(movement) {
        return m;
    }
    let identity = extract_identity(&movement.concepto);
    let amount = movement.amount();
    let mut candidates = Vec::new();

    for payment in pools.payments_received {
        let Some(ref linked) = payment.matched_factura_file_id else { continue };
        if !pools.invoices_issued.iter().any(|inv| &inv.meta.file_id == linked) {
            continue;
        }
        if !within_window(movement.fecha, payment.fecha_pago, -15, 15) {
            continue;
        }
        let Some(ok) = amounts_match(payment.importe_pagado, payment.moneda, amount, adva_core::Currency::ARS, payment.fecha_pago, rates, tolerance_pct) else { continue };
        if !ok {
            continue;
        }
        candidates.push(Candidate {
            file_id: linked.clone(),
            tier: Tier::T1PagoFacturaLink,
            date_diff_days: day_distance(movement.fecha, payment.fecha_pago),
            is_exact_amount: payment.importe_pagado.approx_eq(&amount, 0),
            cross_currency: is_cross_currency(payment.moneda, adva_core::Currency::ARS),
            used_retenciones: Vec::new(),
            reason: format!("payment {} already linked to this invoice", payment.meta.file_id),
        });
    }

    if candidates.is_empty() {
        gather_candidates_credit(movement, pools, &identity, rates, tolerance_pct, &mut candidates);
    }

    if (identity.extracted_cuit.is_some() || identity.extracted_ref.is_some()) && candidates.is_empty() {
        return MovementMatch::no_match();
    }

    let Some(winner) = best_candidate(candidates) else {
        return MovementMatch::no_match();
    };

    build_match_credit(movement, pools, &identity, winner)
}

fn gather_candidates_credit(movement: &BankMovement, pools: &CreditPools, identity: &Identity, rates: &dyn RateLookup, tolerance_pct: f64, out: &mut Vec<Candidate>) {
    let amount = movement.amount();

    for inv in pools.invoices_issued {
        let cuit_receptor = inv.cuit_receptor.as_deref();
        if identity.extracted_cuit.is_some() && cuit_receptor != identity.extracted_cuit.as_deref() {
            continue;
        }
        if identity.extracted_ref.is_some() {
            continue;
        }
        if !within_window(inv.fecha_emision, movement.fecha, -5, 30) {
            continue;
        }

        let direct_ok = amounts_match(inv.importe_total, inv.moneda, amount, adva_core::Currency::ARS, inv.fecha_emision, rates, tolerance_pct).unwrap_or(false);
        let cross_currency = is_cross_currency(inv.moneda, adva_core::Currency::ARS);

        let (matched, used_retenciones) = if direct_ok {
            (true, Vec::new())
        } else {
            let related: Vec<&Withholding> = pools
                .withholdings
                .iter()
                .filter(|w| Some(w.cuit_agente_retencion.as_str()) == inv.cuit_receptor.as_deref() && within_window(inv.fecha_emision, w.fecha_emision, 0, 90))
                .collect();
            let retenciones_total: i64 = related.iter().map(|w| w.monto_retencion.cents()).sum();
            let adjusted = amount.checked_add(&adva_core::Amount::from_cents(retenciones_total));
            if adjusted.approx_eq(&inv.importe_total, 100) {
                (true, related.iter().map(|w| w.meta.file_id.clone()).collect())
            } else {
                (false, Vec::new())
            }
        };
        if !matched {
            continue;
        }

        let tier = match (&identity.extracted_cuit, !used_retenciones.is_empty()) {
            (Some(_), _) => Tier::T2CuitIdentity,
            (None, true) => Tier::T2CuitIdentity,
            (None, false) => {
                let Some(t) = assign_identity_tier(identity, None, None, &inv.razon_social_receptor.clone().unwrap_or_default(), inv.concepto.as_deref()) else { continue };
                t
            }
        };

        out.push(Candidate {
            file_id: inv.meta.file_id.clone(),
            tier,
            date_diff_days: day_distance(inv.fecha_emision, movement.fecha),
            is_exact_amount: direct_ok && inv.importe_total.approx_eq(&amount, 0) && !cross_currency,
            cross_currency,
            used_retenciones,
            reason: "invoice-issued matched by amount (possibly retention-adjusted)/date/identity".to_string(),
        });
    }

    for payment in pools.payments_received {
        if identity.extracted_cuit.is_some() {
            let hit = payment.cuit_pagador.as_deref() == identity.extracted_cuit.as_deref()
                || payment.cuit_beneficiario.as_deref() == identity.extracted_cuit.as_deref();
            if !hit {
                continue;
            }
        }
        if identity.extracted_ref.is_some() && payment.referencia.as_deref() != identity.extracted_ref.as_deref() {
            continue;
        }
        if !within_window(movement.fecha, payment.fecha_pago, -15, 15) {
            continue;
        }
        let Some(ok) = amounts_match(payment.importe_pagado, payment.moneda, amount, adva_core::Currency::ARS, payment.fecha_pago, rates, tolerance_pct) else { continue };
        if !ok {
            continue;
        }
        let cross_currency = is_cross_currency(payment.moneda, adva_core::Currency::ARS);
        let Some(tier) = assign_identity_tier(
            identity,
            payment.cuit_pagador.as_deref().or(payment.cuit_beneficiario.as_deref()),
            payment.referencia.as_deref(),
            payment.nombre_pagador.as_deref().unwrap_or_default(),
            None,
        ) else {
            continue;
        };
        out.push(Candidate {
            file_id: payment.meta.file_id.clone(),
            tier,
            date_diff_days: day_distance(movement.fecha, payment.fecha_pago),
            is_exact_amount: payment.importe_pagado.approx_eq(&amount, 0) && !cross_currency,
            cross_currency,
            used_retenciones: Vec::new(),
            reason: "payment-received matched by amount/date/identity".to_string(),
        });
    }
}

fn build_match_credit(movement: &BankMovement, pools: &CreditPools, identity: &Identity, winner: Candidate) -> MovementMatch {
    if let Some(inv) = pools.invoices_issued.iter().find(|i| i.meta.file_id == winner.file_id) {
        let match_type = if winner.tier == Tier::T1PagoFacturaLink { MatchType::PagoFactura } else { MatchType::DirectFactura };
        let desc = description(match_type, true, None, inv.razon_social_receptor.as_deref(), inv.concepto.as_deref(), !winner.used_retenciones.is_empty());
        return finish(match_type, desc, winner, identity);
    }
    if let Some(payment) = pools.payments_received.iter().find(|p| p.meta.file_id == winner.file_id) {
        let nombre = payment.nombre_pagador.clone().unwrap_or_default();
        let desc = format!("REVISAR! Cobro de {nombre}");
        return finish(MatchType::PagoOnly, desc, winner, identity);
    }
    MovementMatch::no_match()
}

fn finish(match_type: MatchType, description: String, winner: Candidate, identity: &Identity) -> MovementMatch {
    MovementMatch {
        confidence: Some(winner.tier.confidence(winner.cross_currency)),
        match_type,
        description,
        matched_file_id: Some(winner.file_id),
        extracted_cuit: identity.extracted_cuit.clone(),
        tier: Some(winner.tier),
        reasons: vec![winner.reason],
    }
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

    fn movement(concepto: &str, fecha: &str, debito: Option<i64>, credito: Option<i64>) -> BankMovement {
        BankMovement {
            meta: meta("mv1"),
            fecha: chrono::NaiveDate::parse_from_str(fecha, "%Y-%m-%d").unwrap(),
            fecha_valor: chrono::NaiveDate::parse_from_str(fecha, "%Y-%m-%d").unwrap(),
            concepto: concepto.into(),
            codigo: "01".into(),
            oficina: "001".into(),
            credito: credito.map(Amount::from_cents),
            debito: debito.map(Amount::from_cents),
            detalle: String::new(),
            matched_file_id: None,
        }
    }

    fn invoice(id: &str, fecha: &str, total_cents: i64, cuit_emisor: &str, razon: &str) -> Invoice {
        Invoice {
            meta: meta(id),
            tipo_comprobante: InvoiceType::A,
            nro_factura: "0001-00000001".into(),
            fecha_emision: chrono::NaiveDate::parse_from_str(fecha, "%Y-%m-%d").unwrap(),
            cuit_emisor: cuit_emisor.into(),
            razon_social_emisor: razon.into(),
            cuit_receptor: None,
            razon_social_receptor: None,
            importe_neto: Amount::from_cents(total_cents),
            importe_iva: Amount::ZERO,
            importe_total: Amount::from_cents(total_cents),
            moneda: Currency::ARS,
            concepto: Some("servicios".into()),
            matched_pago_file_id: None,
            match_confidence: None,
        }
    }

    fn payment(id: &str, fecha: &str, amount_cents: i64, beneficiario_cuit: Option<&str>, referencia: Option<&str>) -> Payment {
        Payment {
            meta: meta(id),
            banco: "Galicia".into(),
            fecha_pago: chrono::NaiveDate::parse_from_str(fecha, "%Y-%m-%d").unwrap(),
            importe_pagado: Amount::from_cents(amount_cents),
            moneda: Currency::ARS,
            referencia: referencia.map(String::from),
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
    fn bank_fee_phase0_short_circuits() {
        let mv = movement("COMISION MANTENIMIENTO DE CUENTA", "2025-06-01", Some(500), None);
        let pools = DebitPools { invoices_received: &[], payments_sent: &[], receipts: &[] };
        let m = match_debit(&mv, &pools, &FixedRate(0.0), 5.0);
        assert_eq!(m.match_type, MatchType::BankFee);
        assert_eq!(m.description, "Gastos bancarios");
    }

    #[test]
    fn credit_card_payment_phase0_on_debit_only() {
        let mv = movement("PAGO TARJETA VISA 1234", "2025-06-01", Some(1000), None);
        let pools = DebitPools { invoices_received: &[], payments_sent: &[], receipts: &[] };
        let m = match_debit(&mv, &pools, &FixedRate(0.0), 5.0);
        assert_eq!(m.match_type, MatchType::CreditCardPayment);
    }

    #[test]
    fn cuit_identity_tier2_hard_filters_out_non_matching_candidates() {
        let inv_match = invoice("f1", "2025-06-01", 100_000, "20123456786", "Proveedor SA");
        let inv_other = invoice("f2", "2025-06-01", 100_000, "20987654329", "Otro SA");
        let mv = movement("PAGO CUIT 20123456786 VARIOS", "2025-06-05", Some(100_000), None);
        let pools = DebitPools { invoices_received: &[inv_match, inv_other], payments_sent: &[], receipts: &[] };
        let m = match_debit(&mv, &pools, &FixedRate(0.0), 5.0);
        assert_eq!(m.tier, Some(Tier::T2CuitIdentity));
        assert_eq!(m.matched_file_id, Some(FileId::new("f1")));
    }

    #[test]
    fn hard_filter_with_no_surviving_candidate_yields_no_match_no_fallthrough() {
        let inv_other = invoice("f2", "2025-06-01", 100_000, "20987654329", "Otro SA");
        let mv = movement("PAGO CUIT 20123456786 VARIOS", "2025-06-05", Some(100_000), None);
        let pools = DebitPools { invoices_received: &[inv_other], payments_sent: &[], receipts: &[] };
        let m = match_debit(&mv, &pools, &FixedRate(0.0), 5.0);
        assert_eq!(m.match_type, MatchType::NoMatch);
    }

    #[test]
    fn reference_number_tier3_matches_payment_referencia() {
        let pay = payment("p1", "2025-06-02", 50_000, None, Some("1234567"));
        let mv = movement("TRANSFERENCIA REF 1234567.89.0001", "2025-06-03", Some(50_000), None);
        let pools = DebitPools { invoices_received: &[], payments_sent: &[pay], receipts: &[] };
        let m = match_debit(&mv, &pools, &FixedRate(0.0), 5.0);
        assert_eq!(m.tier, Some(Tier::T3RefIdentity));
    }

    #[test]
    fn keyword_tier4_on_name_match() {
        let inv = invoice("f1", "2025-06-01", 100_000, "20123456786", "Distribuidora Norte SA");
        let mv = movement("PAGO A DISTRIBUIDORA NORTE", "2025-06-05", Some(100_000), None);
        let pools = DebitPools { invoices_received: &[inv], payments_sent: &[], receipts: &[] };
        let m = match_debit(&mv, &pools, &FixedRate(0.0), 5.0);
        assert_eq!(m.tier, Some(Tier::T4Keyword));
    }

    #[test]
    fn no_identity_signal_falls_to_tier5_amount_date_only() {
        let inv = invoice("f1", "2025-06-01", 100_000, "20123456786", "Distribuidora Norte SA");
        let mv = movement("VARIOS GASTOS", "2025-06-05", Some(100_000), None);
        let pools = DebitPools { invoices_received: &[inv], payments_sent: &[], receipts: &[] };
        let m = match_debit(&mv, &pools, &FixedRate(0.0), 5.0);
        assert_eq!(m.tier, Some(Tier::T5AmountDateOnly));
        assert_eq!(m.confidence, Some(adva_core::MatchConfidence::Low));
    }

    #[test]
    fn withholding_adjustment_matches_credit_movement_short_of_invoice_total() {
        // Realistic `invoices_issued` shape: ADVA is the issuer, the client is
        // the receptor -- and the receptor is who withholds tax on payment.
        let inv = Invoice {
            cuit_receptor: Some("20123456786".into()),
            ..invoice("f1", "2025-06-01", 121_000, adva_core::ADVA_CUIT, "ADVA")
        };
        let withholding = Withholding {
            meta: meta("w1"),
            cuit_agente_retencion: "20123456786".into(),
            fecha_emision: chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            monto_retencion: Amount::from_cents(21_000),
        };
        // movement credits 100_000, + 21_000 retencion = 121_000 == invoice total.
        let mv = movement("COBRO CUIT 20123456786 VARIOS", "2025-06-10", None, Some(100_000));
        let pools = CreditPools { invoices_issued: &[inv], payments_received: &[], withholdings: &[withholding] };
        let m = match_credit(&mv, &pools, &FixedRate(0.0), 5.0);
        assert_eq!(m.match_type, MatchType::DirectFactura);
        assert!(m.description.contains("con retencion"));
    }
}
