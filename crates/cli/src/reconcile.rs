//! `adva reconcile` (§4.7-§4.11): re-run the matchers over every unmatched
//! row in the ledger, write back the links it finds, and report counts.
//! Grounded in `visigrid-cli/src/recon.rs`'s config-driven `vgrid recon run`
//! shape (read inputs, run, summarize, exit non-zero on material mismatch).

use adva_core::{Amount, BankMovement, Currency, FileId, Invoice, InvoiceType, MatchConfidence, Payment, Receipt, ReceiptType, RecordMeta, Withholding};
use adva_recon::orchestrator::{best_receipt_match, cascade_invoice_payment};
use adva_recon::toctou::{guard_unchanged, row_hash, RowSnapshot};
use adva_recon::{bank_tier, MatchType};
use adva_store::tabular_store::{CellUpdate, TabularStore};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::CliError;

#[derive(Debug, Default, Serialize)]
pub struct ReconcileReport {
    pub invoice_payment_links: usize,
    pub receipt_payment_links: usize,
    pub bank_matched: usize,
    pub bank_needs_review: usize,
    pub bank_toctou_conflicts: usize,
}

impl ReconcileReport {
    pub fn print_human(&self) {
        println!("invoice<->payment links: {}", self.invoice_payment_links);
        println!("receipt<->payment links: {}", self.receipt_payment_links);
        println!("bank movements matched: {}", self.bank_matched);
        println!("bank movements needing review: {}", self.bank_needs_review);
        if self.bank_toctou_conflicts > 0 {
            println!("bank movements skipped (changed since read): {}", self.bank_toctou_conflicts);
        }
    }

    pub fn print_json(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{json}");
        }
    }

    pub fn has_mismatches(&self) -> bool {
        self.bank_needs_review > 0 || self.bank_toctou_conflicts > 0
    }
}

struct FixedNoRate;
impl adva_recon::RateLookup for FixedNoRate {
    fn venta_rate(&self, _date: chrono::NaiveDate) -> Option<f64> {
        None
    }
}

pub fn cmd_reconcile(config: &PipelineConfig, json: bool) -> Result<ReconcileReport, CliError> {
    let sheets = crate::local_store::CsvTabularStore::new(&config.ledger_dir);
    let rates = FixedNoRate;
    let mut report = ReconcileReport::default();

    let mut invoices_received = read_invoices(&sheets, "facturas_recibidas")?;
    let mut invoices_issued = read_invoices(&sheets, "facturas_emitidas")?;
    let mut payments_sent = read_payments(&sheets, "pagos_enviados")?;
    let mut payments_received = read_payments(&sheets, "pagos_recibidos")?;
    let receipts = read_receipts(&sheets, "recibos")?;
    let withholdings = read_withholdings(&sheets, "retenciones")?;

    reconcile_payments_against_invoices(&sheets, "pagos_enviados", "facturas_recibidas", &mut payments_sent, &mut invoices_received, &rates, config, &mut report)?;
    reconcile_payments_against_invoices(&sheets, "pagos_recibidos", "facturas_emitidas", &mut payments_received, &mut invoices_issued, &rates, config, &mut report)?;
    reconcile_payments_against_receipts(&sheets, "pagos_enviados", &mut payments_sent, &receipts, &rates, config, &mut report)?;

    reconcile_bank_movements(
        &sheets,
        &invoices_received,
        &payments_sent,
        &receipts,
        &invoices_issued,
        &payments_received,
        &withholdings,
        &rates,
        config,
        &mut report,
    )?;

    if json {
        report.print_json();
    } else if !config.quiet {
        report.print_human();
    }
    Ok(report)
}

// ---------------------------------------------------------------------
// Invoice<->Payment / Receipt<->Payment cascades
// ---------------------------------------------------------------------

/// Links unmatched payments to invoices, displacing weaker existing matches
/// and cascading onto the counterpart a displacement frees (§4.10): when
/// `cascade_invoice_payment` steals an invoice from its current payment, that
/// payment's own link is now stale and gets a chance to re-match against
/// whatever invoices remain, bounded by `max_cascade_depth`/`cascade_timeout_ms`
/// (`orchestrator::cascade_invoice_payment`'s own doc comment describes this
/// as the driver's responsibility, not something it bounds itself).
fn reconcile_payments_against_invoices(
    sheets: &crate::local_store::CsvTabularStore,
    payments_sheet: &str,
    invoices_sheet: &str,
    payments: &mut [Payment],
    invoices: &mut [Invoice],
    rates: &dyn adva_recon::RateLookup,
    config: &PipelineConfig,
    report: &mut ReconcileReport,
) -> Result<(), CliError> {
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(config.cascade_timeout_ms);

    for start_idx in 0..payments.len() {
        if payments[start_idx].matched_factura_file_id.is_some() {
            continue;
        }

        let mut current_id = payments[start_idx].meta.file_id.clone();
        let mut depth = 0;

        while depth < config.max_cascade_depth && std::time::Instant::now() < deadline {
            let Some(idx) = payments.iter().position(|p| p.meta.file_id == current_id) else { break };

            let invoice_refs: Vec<&Invoice> = invoices.iter().collect();
            let Some(displacement) =
                cascade_invoice_payment(&payments[idx], &invoice_refs, rates, config.match_days_before, config.match_days_after, config.usd_ars_tolerance_percent)
            else {
                break;
            };

            payments[idx].matched_factura_file_id = Some(displacement.invoice_file_id.clone());
            payments[idx].match_confidence = Some(displacement.confidence);
            update_payment_match_column(sheets, payments_sheet, idx, Some(&displacement.invoice_file_id))?;

            if let Some(inv_idx) = invoices.iter().position(|i| i.meta.file_id == displacement.invoice_file_id) {
                invoices[inv_idx].matched_pago_file_id = Some(payments[idx].meta.file_id.clone());
                invoices[inv_idx].match_confidence = Some(displacement.confidence);
                update_invoice_match_columns(sheets, invoices_sheet, inv_idx, &payments[idx].meta.file_id, displacement.confidence)?;
            }
            report.invoice_payment_links += 1;

            match displacement.freed_invoice_file_id {
                Some(freed_payment_id) => {
                    if let Some(freed_idx) = payments.iter().position(|p| p.meta.file_id == freed_payment_id) {
                        payments[freed_idx].matched_factura_file_id = None;
                        payments[freed_idx].match_confidence = None;
                        update_payment_match_column(sheets, payments_sheet, freed_idx, None)?;
                    }
                    current_id = freed_payment_id;
                    depth += 1;
                }
                None => break,
            }
        }
    }
    Ok(())
}

fn reconcile_payments_against_receipts(
    sheets: &crate::local_store::CsvTabularStore,
    payments_sheet: &str,
    payments: &mut [Payment],
    receipts: &[Receipt],
    rates: &dyn adva_recon::RateLookup,
    config: &PipelineConfig,
    report: &mut ReconcileReport,
) -> Result<(), CliError> {
    for (idx, payment) in payments.iter_mut().enumerate() {
        if payment.matched_factura_file_id.is_some() {
            continue;
        }
        let receipt_refs: Vec<&Receipt> = receipts.iter().collect();
        if let Some(displacement) =
            best_receipt_match(payment, &receipt_refs, rates, config.match_days_before, config.match_days_after, config.usd_ars_tolerance_percent)
        {
            payment.matched_factura_file_id = Some(displacement.receipt_file_id.clone());
            payment.match_confidence = Some(displacement.confidence);
            update_payment_match_column(sheets, payments_sheet, idx, Some(&displacement.receipt_file_id))?;
            report.receipt_payment_links += 1;
        }
    }
    Ok(())
}

/// `None` clears the column, used when a cascade frees a payment's stale
/// invoice link.
fn update_payment_match_column(sheets: &crate::local_store::CsvTabularStore, sheet: &str, row_idx: usize, matched_file_id: Option<&FileId>) -> Result<(), CliError> {
    let mut rows = sheets.get_values(sheet, "A:Z")?;
    if let Some(row) = rows.get_mut(row_idx) {
        if row.len() < 16 {
            row.resize(16, String::new());
        }
        row[15] = matched_file_id.map(ToString::to_string).unwrap_or_default();
    }
    let range = format!("A{row}:Z{row}", row = row_idx + 1);
    sheets.batch_update(&[CellUpdate { sheet: sheet.to_string(), range, values: vec![rows[row_idx].clone()] }])?;
    Ok(())
}

fn update_invoice_match_columns(sheets: &crate::local_store::CsvTabularStore, sheet: &str, row_idx: usize, payment_file_id: &FileId, confidence: MatchConfidence) -> Result<(), CliError> {
    let mut rows = sheets.get_values(sheet, "A:Z")?;
    if let Some(row) = rows.get_mut(row_idx) {
        if row.len() < 18 {
            row.resize(18, String::new());
        }
        row[15] = payment_file_id.to_string();
        row[16] = confidence.to_string();
    }
    let range = format!("A{row}:Z{row}", row = row_idx + 1);
    sheets.batch_update(&[CellUpdate { sheet: sheet.to_string(), range, values: vec![rows[row_idx].clone()] }])?;
    Ok(())
}

// ---------------------------------------------------------------------
// Bank-movement tier matcher
// ---------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn reconcile_bank_movements(
    sheets: &crate::local_store::CsvTabularStore,
    invoices_received: &[Invoice],
    payments_sent: &[Payment],
    receipts: &[Receipt],
    invoices_issued: &[Invoice],
    payments_received: &[Payment],
    withholdings: &[Withholding],
    rates: &dyn adva_recon::RateLookup,
    config: &PipelineConfig,
    report: &mut ReconcileReport,
) -> Result<(), CliError> {
    let movements = read_movements(sheets, "bancos")?;
    let debit_pools = bank_tier::DebitPools { invoices_received, payments_sent, receipts };
    let credit_pools = bank_tier::CreditPools { invoices_issued, payments_received, withholdings };

    for (idx, movement) in movements.iter().enumerate() {
        if movement.matched_file_id.is_some() {
            continue;
        }

        let snapshot_before = row_snapshot(movement);
        let hash_before = row_hash(&snapshot_before);

        let result = if movement.is_credit() {
            bank_tier::match_credit(movement, &credit_pools, rates, config.usd_ars_tolerance_percent)
        } else {
            bank_tier::match_debit(movement, &debit_pools, rates, config.usd_ars_tolerance_percent)
        };

        if result.match_type == MatchType::NoMatch {
            report.bank_needs_review += 1;
            continue;
        }

        let current_rows = sheets.get_values("bancos", "A:Z")?;
        let Some(current_row) = current_rows.get(idx) else { continue };
        let current_movement = movement_from_row(current_row)?;
        let snapshot_now = row_snapshot(&current_movement);
        if !guard_unchanged(&hash_before, &snapshot_now) {
            report.bank_toctou_conflicts += 1;
            continue;
        }

        write_movement_match(sheets, idx, &result)?;
        report.bank_matched += 1;
    }

    Ok(())
}

fn row_snapshot(movement: &BankMovement) -> RowSnapshot {
    RowSnapshot {
        fecha: movement.fecha,
        concepto: movement.concepto.clone(),
        debito: movement.debito,
        credito: movement.credito,
        existing_matched_file_id: movement.matched_file_id.clone(),
        existing_detalle: movement.detalle.clone(),
    }
}

fn write_movement_match(sheets: &crate::local_store::CsvTabularStore, row_idx: usize, result: &adva_recon::MovementMatch) -> Result<(), CliError> {
    let mut rows = sheets.get_values("bancos", "A:Z")?;
    if let Some(row) = rows.get_mut(row_idx) {
        if row.len() < 14 {
            row.resize(14, String::new());
        }
        row[9] = result.description.clone();
        row[10] = result.matched_file_id.as_ref().map(ToString::to_string).unwrap_or_default();
    }
    let range = format!("A{row}:Z{row}", row = row_idx + 1);
    sheets.batch_update(&[CellUpdate { sheet: "bancos".to_string(), range, values: vec![rows[row_idx].clone()] }])?;
    Ok(())
}

// ---------------------------------------------------------------------
// CSV row <-> struct conversions (mirrors `adva_pipeline::pipeline`'s
// `invoice_row`/`payment_row`/`receipt_row` writers, in reverse).
// ---------------------------------------------------------------------

fn meta_from(file_id: &str, file_name: &str, processed_at: &str, confidence: &str, needs_review: &str) -> RecordMeta {
    RecordMeta {
        file_id: FileId::new(file_id),
        file_name: file_name.to_string(),
        processed_at: chrono::DateTime::parse_from_rfc3339(processed_at).map(|d| d.with_timezone(&chrono::Utc)).unwrap_or_else(|_| chrono::Utc::now()),
        confidence: confidence.parse().unwrap_or(0.0),
        needs_review: needs_review == "true",
    }
}

fn parse_currency(s: &str) -> Currency {
    if s.eq_ignore_ascii_case("USD") {
        Currency::USD
    } else {
        Currency::ARS
    }
}

fn parse_invoice_type(s: &str) -> InvoiceType {
    match s {
        "B" => InvoiceType::B,
        "C" => InvoiceType::C,
        "E" => InvoiceType::E,
        "NC" => InvoiceType::NC,
        "ND" => InvoiceType::ND,
        _ => InvoiceType::A,
    }
}

fn parse_receipt_type(s: &str) -> ReceiptType {
    match s {
        "LiquidacionFinal" => ReceiptType::LiquidacionFinal,
        _ => ReceiptType::Sueldo,
    }
}

fn col(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

fn invoice_from_row(row: &[String]) -> Result<Invoice, CliError> {
    let meta = meta_from(col(row, 1), col(row, 2), col(row, 12), col(row, 13), col(row, 14));
    Ok(Invoice {
        meta,
        tipo_comprobante: parse_invoice_type(col(row, 3)),
        nro_factura: col(row, 4).to_string(),
        fecha_emision: chrono::NaiveDate::parse_from_str(col(row, 0), "%Y-%m-%d").map_err(|e| CliError::config(e.to_string()))?,
        cuit_emisor: col(row, 5).to_string(),
        razon_social_emisor: col(row, 6).to_string(),
        cuit_receptor: None,
        razon_social_receptor: None,
        importe_neto: Amount::try_from(col(row, 7).to_string()).map_err(|e| CliError::config(e.to_string()))?,
        importe_iva: Amount::try_from(col(row, 8).to_string()).map_err(|e| CliError::config(e.to_string()))?,
        importe_total: Amount::try_from(col(row, 9).to_string()).map_err(|e| CliError::config(e.to_string()))?,
        moneda: parse_currency(col(row, 10)),
        concepto: non_empty(col(row, 11)),
        matched_pago_file_id: non_empty(col(row, 15)).map(FileId::new),
        match_confidence: non_empty(col(row, 16)).map(|s| parse_confidence(&s)),
    })
}

fn payment_from_row(row: &[String]) -> Result<Payment, CliError> {
    let meta = meta_from(col(row, 1), col(row, 2), col(row, 12), col(row, 13), col(row, 14));
    Ok(Payment {
        meta,
        banco: col(row, 3).to_string(),
        fecha_pago: chrono::NaiveDate::parse_from_str(col(row, 0), "%Y-%m-%d").map_err(|e| CliError::config(e.to_string()))?,
        importe_pagado: Amount::try_from(col(row, 4).to_string()).map_err(|e| CliError::config(e.to_string()))?,
        moneda: parse_currency(col(row, 5)),
        referencia: non_empty(col(row, 6)),
        cuit_pagador: non_empty(col(row, 7)),
        nombre_pagador: non_empty(col(row, 8)),
        cuit_beneficiario: non_empty(col(row, 9)),
        nombre_beneficiario: non_empty(col(row, 10)),
        concepto: non_empty(col(row, 11)),
        matched_factura_file_id: non_empty(col(row, 15)).map(FileId::new),
        match_confidence: None,
    })
}

fn receipt_from_row(row: &[String]) -> Result<Receipt, CliError> {
    let meta = meta_from(col(row, 1), col(row, 2), col(row, 12), col(row, 13), "false");
    Ok(Receipt {
        meta,
        tipo: parse_receipt_type(col(row, 3)),
        nombre_empleado: col(row, 4).to_string(),
        cuil_empleado: col(row, 5).to_string(),
        legajo: col(row, 6).to_string(),
        cuit_empleador: col(row, 7).to_string(),
        periodo_abonado: col(row, 8).to_string(),
        fecha_pago: chrono::NaiveDate::parse_from_str(col(row, 0), "%Y-%m-%d").map_err(|e| CliError::config(e.to_string()))?,
        subtotal_remuneraciones: Amount::try_from(col(row, 9).to_string()).map_err(|e| CliError::config(e.to_string()))?,
        subtotal_descuentos: Amount::try_from(col(row, 10).to_string()).map_err(|e| CliError::config(e.to_string()))?,
        total_neto: Amount::try_from(col(row, 11).to_string()).map_err(|e| CliError::config(e.to_string()))?,
        tarea_desempenada: None,
    })
}

/// Column layout: `cuitAgenteRetencion, fechaEmision, montoRetencion, fileId, fileName`.
fn withholding_from_row(row: &[String]) -> Result<Withholding, CliError> {
    let meta = meta_from(col(row, 3), col(row, 4), "", "1.0", "false");
    Ok(Withholding {
        meta,
        cuit_agente_retencion: col(row, 0).to_string(),
        fecha_emision: chrono::NaiveDate::parse_from_str(col(row, 1), "%Y-%m-%d").map_err(|e| CliError::config(e.to_string()))?,
        monto_retencion: Amount::try_from(col(row, 2).to_string()).map_err(|e| CliError::config(e.to_string()))?,
    })
}

/// Column layout for the per-account statement sheet: `fecha, fechaValor,
/// fileId, fileName, concepto, codigo, oficina, credito, debito, detalle,
/// matchedFileId, processedAt, confidence, needsReview`.
fn movement_from_row(row: &[String]) -> Result<BankMovement, CliError> {
    let meta = meta_from(col(row, 2), col(row, 3), col(row, 11), col(row, 12), col(row, 13));
    Ok(BankMovement {
        meta,
        fecha: chrono::NaiveDate::parse_from_str(col(row, 0), "%Y-%m-%d").map_err(|e| CliError::config(e.to_string()))?,
        fecha_valor: chrono::NaiveDate::parse_from_str(col(row, 1), "%Y-%m-%d").map_err(|e| CliError::config(e.to_string()))?,
        concepto: col(row, 4).to_string(),
        codigo: col(row, 5).to_string(),
        oficina: col(row, 6).to_string(),
        credito: non_empty(col(row, 7)).and_then(|s| Amount::try_from(s).ok()),
        debito: non_empty(col(row, 8)).and_then(|s| Amount::try_from(s).ok()),
        detalle: col(row, 9).to_string(),
        matched_file_id: non_empty(col(row, 10)).map(FileId::new),
    })
}

fn parse_confidence(s: &str) -> MatchConfidence {
    match s {
        "HIGH" => MatchConfidence::High,
        "MEDIUM" => MatchConfidence::Medium,
        _ => MatchConfidence::Low,
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn read_invoices(sheets: &crate::local_store::CsvTabularStore, sheet: &str) -> Result<Vec<Invoice>, CliError> {
    sheets.get_values(sheet, "A:Z")?.iter().map(|row| invoice_from_row(row)).collect()
}

fn read_payments(sheets: &crate::local_store::CsvTabularStore, sheet: &str) -> Result<Vec<Payment>, CliError> {
    sheets.get_values(sheet, "A:Z")?.iter().map(|row| payment_from_row(row)).collect()
}

fn read_receipts(sheets: &crate::local_store::CsvTabularStore, sheet: &str) -> Result<Vec<Receipt>, CliError> {
    sheets.get_values(sheet, "A:Z")?.iter().map(|row| receipt_from_row(row)).collect()
}

fn read_withholdings(sheets: &crate::local_store::CsvTabularStore, sheet: &str) -> Result<Vec<Withholding>, CliError> {
    sheets.get_values(sheet, "A:Z")?.iter().map(|row| withholding_from_row(row)).collect()
}

fn read_movements(sheets: &crate::local_store::CsvTabularStore, sheet: &str) -> Result<Vec<BankMovement>, CliError> {
    sheets.get_values(sheet, "A:Z")?.iter().map(|row| movement_from_row(row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_store::CsvTabularStore;

    fn invoice_row(file_id: &str, fecha: &str) -> Vec<String> {
        vec![
            fecha.into(),
            file_id.into(),
            format!("{file_id}.pdf"),
            "A".into(),
            "0001-00000001".into(),
            "20123456786".into(),
            "Proveedor SA".into(),
            "1000,00".into(),
            "0,00".into(),
            "1000,00".into(),
            "ARS".into(),
            "servicios".into(),
            "2025-06-01T00:00:00Z".into(),
            "1.0".into(),
            "false".into(),
            String::new(),
            String::new(),
        ]
    }

    fn payment_row(file_id: &str, fecha: &str) -> Vec<String> {
        vec![
            fecha.into(),
            file_id.into(),
            format!("{file_id}.pdf"),
            "Galicia".into(),
            "1000,00".into(),
            "ARS".into(),
            String::new(),
            String::new(),
            String::new(),
            "20123456786".into(),
            String::new(),
            String::new(),
            "2025-06-01T00:00:00Z".into(),
            "1.0".into(),
            "false".into(),
            String::new(),
        ]
    }

    /// A second, better-dated invoice arrives for the payment holding the
    /// weaker match: the cascade steals that invoice, and the displaced
    /// payment gets re-matched onto the invoice the newcomer didn't want,
    /// instead of being left with a stale `matchedFacturaFileId` (§8).
    #[test]
    fn freed_payment_is_cleared_and_recascaded_onto_the_remaining_invoice() {
        let dir = tempfile::tempdir().unwrap();
        let sheets = CsvTabularStore::new(dir.path());

        sheets.append_rows("facturas_recibidas", &[invoice_row("inv-old", "2025-06-01"), invoice_row("inv-new", "2025-06-02")]).unwrap();
        sheets.append_rows("pagos_enviados", &[payment_row("pay-old", "2025-06-03"), payment_row("pay-new", "2025-06-01")]).unwrap();

        let mut invoices = read_invoices(&sheets, "facturas_recibidas").unwrap();
        let mut payments = read_payments(&sheets, "pagos_enviados").unwrap();

        // pay-old starts out weakly linked to inv-old; pay-new is unmatched.
        invoices[0].matched_pago_file_id = Some(FileId::new("pay-old"));
        invoices[0].match_confidence = Some(MatchConfidence::Low);
        payments[0].matched_factura_file_id = Some(FileId::new("inv-old"));
        update_invoice_match_columns(&sheets, "facturas_recibidas", 0, &FileId::new("pay-old"), MatchConfidence::Low).unwrap();
        update_payment_match_column(&sheets, "pagos_enviados", 0, Some(&FileId::new("inv-old"))).unwrap();

        let rates = FixedNoRate;
        let config = PipelineConfig::default();
        let mut report = ReconcileReport::default();

        reconcile_payments_against_invoices(&sheets, "pagos_enviados", "facturas_recibidas", &mut payments, &mut invoices, &rates, &config, &mut report).unwrap();

        let pay_old = payments.iter().find(|p| p.meta.file_id == FileId::new("pay-old")).unwrap();
        let pay_new = payments.iter().find(|p| p.meta.file_id == FileId::new("pay-new")).unwrap();
        assert_eq!(pay_new.matched_factura_file_id, Some(FileId::new("inv-old")));
        assert_eq!(pay_old.matched_factura_file_id, Some(FileId::new("inv-new")));

        // The CSV reflects the same state, not just the in-memory structs.
        let reread_payments = read_payments(&sheets, "pagos_enviados").unwrap();
        let reread_old = reread_payments.iter().find(|p| p.meta.file_id == FileId::new("pay-old")).unwrap();
        assert_eq!(reread_old.matched_factura_file_id, Some(FileId::new("inv-new")));
        assert_eq!(report.invoice_payment_links, 2);
    }
}
