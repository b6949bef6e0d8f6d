//! VALIDATING stage (§4.6, §3 invariants). Sanity checks never drop a
//! record; they only collect warnings that feed into `needsReview`.

use adva_core::{is_valid_cuit, Invoice, Receipt};

const AMOUNT_EPSILON_CENTS: i64 = 1;

pub fn validate_invoice(invoice: &Invoice) -> Vec<String> {
    let mut warnings = Vec::new();

    if !is_valid_cuit(&invoice.cuit_emisor) {
        warnings.push(format!("cuitEmisor {:?} fails checksum", invoice.cuit_emisor));
    }
    if let Some(ref receptor) = invoice.cuit_receptor {
        if !receptor.is_empty() && !is_valid_cuit(receptor) {
            warnings.push(format!("cuitReceptor {receptor:?} fails checksum"));
        }
    }

    let expected_total = invoice.importe_neto.checked_add(&invoice.importe_iva);
    if !expected_total.approx_eq(&invoice.importe_total, AMOUNT_EPSILON_CENTS) {
        warnings.push(format!(
            "importeTotal {} does not match importeNeto + importeIva = {}",
            invoice.importe_total, expected_total
        ));
    }

    warnings
}

pub fn validate_receipt(receipt: &Receipt) -> Vec<String> {
    let mut warnings = Vec::new();

    let expected_neto = receipt.subtotal_remuneraciones.checked_sub(&receipt.subtotal_descuentos);
    if !expected_neto.approx_eq(&receipt.total_neto, AMOUNT_EPSILON_CENTS) {
        warnings.push(format!(
            "totalNeto {} does not match subtotalRemuneraciones - subtotalDescuentos = {}",
            receipt.total_neto, expected_neto
        ));
    }

    if !is_valid_cuit(&receipt.cuit_empleador) {
        warnings.push(format!("cuitEmpleador {:?} fails checksum", receipt.cuit_empleador));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use adva_core::{Amount, Currency, FileId, InvoiceType, RecordMeta};

    fn meta() -> RecordMeta {
        RecordMeta {
            file_id: FileId::new("f1"),
            file_name: "f1.pdf".into(),
            processed_at: chrono::Utc::now(),
            confidence: 1.0,
            needs_review: false,
        }
    }

    #[test]
    fn flags_total_mismatch_but_does_not_reject() {
        let invoice = Invoice {
            meta: meta(),
            tipo_comprobante: InvoiceType::A,
            nro_factura: "0001-00000001".into(),
            fecha_emision: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            cuit_emisor: "30709076783".into(),
            razon_social_emisor: "ADVA".into(),
            cuit_receptor: None,
            razon_social_receptor: None,
            importe_neto: Amount::from_cents(100_00),
            importe_iva: Amount::from_cents(21_00),
            importe_total: Amount::from_cents(999_00),
            moneda: Currency::ARS,
            concepto: None,
            matched_pago_file_id: None,
            match_confidence: None,
        };
        let warnings = validate_invoice(&invoice);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("importeTotal"));
    }
}
