//! Cross-module reconciliation flow: bank-tier matching, the displacement
//! orchestrator, and the TOCTOU guard working together the way `adva
//! reconcile` drives them, without any storage layer involved.

use adva_core::{Amount, BankMovement, Currency, FileId, Invoice, InvoiceType, MatchConfidence, Payment, RecordMeta};
use adva_recon::bank_tier::{match_debit, DebitPools};
use adva_recon::model::{MatchType, Tier};
use adva_recon::orchestrator::cascade_invoice_payment;
use adva_recon::toctou::{guard_unchanged, row_hash, RowSnapshot};
use adva_recon::RateLookup;

struct FixedRate(f64);
impl RateLookup for FixedRate {
    fn venta_rate(&self, _date: chrono::NaiveDate) -> Option<f64> {
        Some(self.0)
    }
}

fn meta(id: &str) -> RecordMeta {
    RecordMeta { file_id: FileId::new(id), file_name: format!("{id}.pdf"), processed_at: chrono::Utc::now(), confidence: 1.0, needs_review: false }
}

fn date(s: &str) -> chrono::NaiveDate {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn invoice(id: &str, fecha: &str, total_cents: i64, cuit_emisor: &str, razon: &str) -> Invoice {
    Invoice {
        meta: meta(id),
        tipo_comprobante: InvoiceType::A,
        nro_factura: "0001-00000001".into(),
        fecha_emision: date(fecha),
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

fn payment(id: &str, fecha: &str, amount_cents: i64, beneficiario_cuit: Option<&str>) -> Payment {
    Payment {
        meta: meta(id),
        banco: "Galicia".into(),
        fecha_pago: date(fecha),
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

fn movement(concepto: &str, fecha: &str, debito_cents: i64) -> BankMovement {
    BankMovement {
        meta: meta("mv1"),
        fecha: date(fecha),
        fecha_valor: date(fecha),
        concepto: concepto.into(),
        codigo: "01".into(),
        oficina: "001".into(),
        credito: None,
        debito: Some(Amount::from_cents(debito_cents)),
        detalle: String::new(),
        matched_file_id: None,
    }
}

/// A weak (amount/date-only) invoice<->payment link later gets displaced by
/// a stronger, identity-confirmed payment, and the freed invoice is left
/// ready to cascade onto whatever payment claimed it before.
#[test]
fn cascade_displaces_weaker_match_and_reports_the_freed_counterpart() {
    let mut inv = invoice("f1", "2025-06-01", 100_000, "20123456786", "Proveedor SA");
    inv.matched_pago_file_id = Some(FileId::new("old-payment"));
    inv.match_confidence = Some(MatchConfidence::Low);

    let strong_payment = payment("p-new", "2025-06-03", 100_000, Some("20123456786"));

    let out = cascade_invoice_payment(&strong_payment, &[&inv], &FixedRate(0.0), 10, 60, 5.0).expect("identity-confirmed payment should win");
    assert_eq!(out.invoice_file_id, FileId::new("f1"));
    assert_eq!(out.confidence, MatchConfidence::High);
    assert_eq!(out.freed_invoice_file_id, Some(FileId::new("old-payment")));

    // A same-tier payment with no stronger signal must not re-displace.
    let weak_payment = payment("p-weak", "2025-06-04", 100_000, None);
    let mut inv_after = inv.clone();
    inv_after.matched_pago_file_id = Some(strong_payment.meta.file_id.clone());
    inv_after.match_confidence = Some(MatchConfidence::High);
    assert!(cascade_invoice_payment(&weak_payment, &[&inv_after], &FixedRate(0.0), 10, 60, 5.0).is_none());
}

/// Bank-tier matching picks a CUIT-identity candidate over a same-amount
/// decoy with no identity signal, and the resulting match survives an
/// unrelated row being re-read afterward (TOCTOU guard passes).
#[test]
fn bank_tier_match_survives_toctou_guard_when_row_is_unchanged() {
    let target = invoice("f1", "2025-06-01", 250_000, "20123456786", "Proveedor SA");
    let decoy = invoice("f2", "2025-06-01", 250_000, "20999999993", "Otro Proveedor SA");
    let mv = movement("PAGO CUIT 20123456786 VARIOS", "2025-06-05", 250_000);

    let snapshot_before = RowSnapshot {
        fecha: mv.fecha,
        concepto: mv.concepto.clone(),
        debito: mv.debito,
        credito: mv.credito,
        existing_matched_file_id: mv.matched_file_id.clone(),
        existing_detalle: mv.detalle.clone(),
    };
    let hash_at_match_time = row_hash(&snapshot_before);

    let pools = DebitPools { invoices_received: &[target, decoy], payments_sent: &[], receipts: &[] };
    let result = match_debit(&mv, &pools, &FixedRate(0.0), 5.0);

    assert_eq!(result.match_type, MatchType::DirectFactura);
    assert_eq!(result.tier, Some(Tier::T2CuitIdentity));
    assert_eq!(result.matched_file_id, Some(FileId::new("f1")));

    // Row hasn't changed since the snapshot was taken: safe to write.
    assert!(guard_unchanged(&hash_at_match_time, &snapshot_before));
}

/// If another writer updates the movement's `detalle`/`matchedFileId`
/// between the snapshot and the write, the guard must refuse the write
/// rather than overwrite a concurrent change.
#[test]
fn toctou_guard_rejects_write_after_concurrent_change() {
    let mv = movement("PAGO CUIT 20123456786 VARIOS", "2025-06-05", 250_000);
    let snapshot_before = RowSnapshot {
        fecha: mv.fecha,
        concepto: mv.concepto.clone(),
        debito: mv.debito,
        credito: mv.credito,
        existing_matched_file_id: mv.matched_file_id.clone(),
        existing_detalle: mv.detalle.clone(),
    };
    let hash_at_match_time = row_hash(&snapshot_before);

    let mut snapshot_after = snapshot_before.clone();
    snapshot_after.existing_matched_file_id = Some(FileId::new("someone-else-wrote-this"));
    snapshot_after.existing_detalle = "Pago Factura a Otro - concurrent write".into();

    assert!(!guard_unchanged(&hash_at_match_time, &snapshot_after));
}
