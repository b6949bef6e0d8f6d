//! Type-specific extraction: JSON-field contracts plus conversion into the
//! typed entities from `adva_core`. The actual vision-model prompt text is
//! an external concern (vendor/prompt tuning lives outside this crate); what
//! lives here is the *shape* every prompt must produce and how that shape
//! becomes a validated entity.

use adva_core::{
    dates::parse_date, money::parse_amount, Amount, Currency, FileId, Invoice, InvoiceType, Payment, Receipt,
    ReceiptType, RecordMeta, Statement,
};
use adva_llm::response_parser::{assign_invoice_direction, compute_confidence, needs_review};
use adva_core::Direction;

use crate::error::PipelineError;

pub const CLASSIFY_PROMPT: &str =
    "Identify this document as one of: factura, pago, recibo, resumen_bancario, unrecognized. \
     Reply as JSON: {\"documentType\":\"...\",\"confidence\":0.0,\"indicators\":[\"...\"]}";

pub const EXTRACT_INVOICE_PROMPT: &str =
    "Extract invoice fields as JSON: tipoComprobante, nroFactura, fechaEmision, cuitEmisor, \
     razonSocialEmisor, cuitReceptor, razonSocialReceptor, importeNeto, importeIva, importeTotal, \
     moneda, concepto, nombreEmisor, nombreReceptor, cuits (array).";

pub const EXTRACT_PAYMENT_PROMPT: &str =
    "Extract payment fields as JSON: banco, fechaPago, importePagado, moneda, referencia, \
     cuitPagador, nombrePagador, cuitBeneficiario, nombreBeneficiario, concepto.";

pub const EXTRACT_RECEIPT_PROMPT: &str =
    "Extract salary receipt fields as JSON: tipo, nombreEmpleado, cuilEmpleado, legajo, \
     cuitEmpleador, periodoAbonado, fechaPago, subtotalRemuneraciones, subtotalDescuentos, \
     totalNeto, tareaDesempenada.";

pub const EXTRACT_STATEMENT_PROMPT: &str =
    "Extract bank statement header fields as JSON: banco, numeroCuenta, fechaDesde, fechaHasta, \
     saldoInicial, saldoFinal, moneda, cantidadMovimientos.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentClass {
    Factura,
    Pago,
    Recibo,
    ResumenBancario,
    Unrecognized,
}

#[derive(Debug)]
pub struct ClassifyResult {
    pub class: DocumentClass,
    pub confidence: f64,
    pub indicators: Vec<String>,
}

pub fn parse_classify_response(value: &serde_json::Value) -> ClassifyResult {
    let class = match value.get("documentType").and_then(|v| v.as_str()).unwrap_or("unrecognized") {
        "factura" => DocumentClass::Factura,
        "pago" => DocumentClass::Pago,
        "recibo" => DocumentClass::Recibo,
        "resumen_bancario" => DocumentClass::ResumenBancario,
        _ => DocumentClass::Unrecognized,
    };
    let confidence = value.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let indicators = value
        .get("indicators")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    ClassifyResult { class, confidence, indicators }
}

const INVOICE_REQUIRED: [&str; 9] = [
    "tipoComprobante",
    "nroFactura",
    "fechaEmision",
    "cuitEmisor",
    "razonSocialEmisor",
    "importeNeto",
    "importeIva",
    "importeTotal",
    "moneda",
];

fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

fn amount_field(value: &serde_json::Value, key: &str) -> Option<Amount> {
    str_field(value, key).and_then(|s| parse_amount(s).ok())
}

fn currency_field(value: &serde_json::Value, key: &str) -> Currency {
    match str_field(value, key) {
        Some("USD") => Currency::USD,
        _ => Currency::ARS,
    }
}

fn present_count(value: &serde_json::Value, fields: &[&str]) -> (usize, bool) {
    let present = fields.iter().filter(|f| str_field(value, f).is_some()).count();
    (present, present < fields.len())
}

pub fn build_invoice(value: &serde_json::Value, file_id: FileId, file_name: String) -> Result<Invoice, PipelineError> {
    let (present, any_missing) = present_count(&value, &INVOICE_REQUIRED);
    let confidence = compute_confidence(present, INVOICE_REQUIRED.len());

    let tipo = match str_field(value, "tipoComprobante") {
        Some("A") => InvoiceType::A,
        Some("B") => InvoiceType::B,
        Some("C") => InvoiceType::C,
        Some("E") => InvoiceType::E,
        Some("NC") => InvoiceType::NC,
        Some("ND") => InvoiceType::ND,
        _ => return Err(PipelineError::Validation("missing or unrecognized tipoComprobante".to_string())),
    };

    let fecha_emision = str_field(value, "fechaEmision")
        .ok_or_else(|| PipelineError::Validation("missing fechaEmision".to_string()))
        .and_then(|s| parse_date(s).map_err(|e| PipelineError::Validation(e.to_string())))?;

    let nombre_emisor = str_field(value, "nombreEmisor").or_else(|| str_field(value, "razonSocialEmisor")).unwrap_or("");
    let nombre_receptor = str_field(value, "nombreReceptor").or_else(|| str_field(value, "razonSocialReceptor")).unwrap_or("");
    let cuits: Vec<String> = value
        .get("cuits")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_else(|| {
            [str_field(value, "cuitEmisor"), str_field(value, "cuitReceptor")]
                .into_iter()
                .flatten()
                .map(str::to_string)
                .collect()
        });

    let (_direction, cuit_emisor, cuit_receptor) = if cuits.is_empty() {
        (Direction::Unrecognized, str_field(value, "cuitEmisor").unwrap_or("").to_string(), String::new())
    } else {
        assign_invoice_direction(nombre_emisor, nombre_receptor, &cuits)?
    };

    let suspicious_empty_optional = value.get("concepto").map(|v| v.as_str() == Some("")).unwrap_or(false);

    Ok(Invoice {
        meta: RecordMeta {
            file_id,
            file_name,
            processed_at: chrono::Utc::now(),
            confidence,
            needs_review: needs_review(confidence, any_missing, suspicious_empty_optional),
        },
        tipo_comprobante: tipo,
        nro_factura: str_field(value, "nroFactura").unwrap_or("").to_string(),
        fecha_emision,
        cuit_emisor,
        razon_social_emisor: nombre_emisor.to_string(),
        cuit_receptor: if cuit_receptor.is_empty() { None } else { Some(cuit_receptor) },
        razon_social_receptor: if nombre_receptor.is_empty() { None } else { Some(nombre_receptor.to_string()) },
        importe_neto: amount_field(value, "importeNeto").unwrap_or(Amount::ZERO),
        importe_iva: amount_field(value, "importeIva").unwrap_or(Amount::ZERO),
        importe_total: amount_field(value, "importeTotal").unwrap_or(Amount::ZERO),
        moneda: currency_field(value, "moneda"),
        concepto: str_field(value, "concepto").map(str::to_string),
        matched_pago_file_id: None,
        match_confidence: None,
    })
}

const PAYMENT_REQUIRED: [&str; 4] = ["banco", "fechaPago", "importePagado", "moneda"];

pub fn build_payment(value: &serde_json::Value, file_id: FileId, file_name: String) -> Result<Payment, PipelineError> {
    let (present, any_missing) = present_count(&value, &PAYMENT_REQUIRED);
    let confidence = compute_confidence(present, PAYMENT_REQUIRED.len());

    let fecha_pago = str_field(value, "fechaPago")
        .ok_or_else(|| PipelineError::Validation("missing fechaPago".to_string()))
        .and_then(|s| parse_date(s).map_err(|e| PipelineError::Validation(e.to_string())))?;

    Ok(Payment {
        meta: RecordMeta {
            file_id,
            file_name,
            processed_at: chrono::Utc::now(),
            confidence,
            needs_review: needs_review(confidence, any_missing, false),
        },
        banco: str_field(value, "banco").unwrap_or("").to_string(),
        fecha_pago,
        importe_pagado: amount_field(value, "importePagado").unwrap_or(Amount::ZERO),
        moneda: currency_field(value, "moneda"),
        referencia: str_field(value, "referencia").map(str::to_string),
        cuit_pagador: str_field(value, "cuitPagador").map(str::to_string),
        nombre_pagador: str_field(value, "nombrePagador").map(str::to_string),
        cuit_beneficiario: str_field(value, "cuitBeneficiario").map(str::to_string),
        nombre_beneficiario: str_field(value, "nombreBeneficiario").map(str::to_string),
        concepto: str_field(value, "concepto").map(str::to_string),
        matched_factura_file_id: None,
        match_confidence: None,
    })
}

const RECEIPT_REQUIRED: [&str; 6] =
    ["nombreEmpleado", "cuilEmpleado", "cuitEmpleador", "periodoAbonado", "fechaPago", "totalNeto"];

pub fn build_receipt(value: &serde_json::Value, file_id: FileId, file_name: String) -> Result<Receipt, PipelineError> {
    let (present, any_missing) = present_count(&value, &RECEIPT_REQUIRED);
    let confidence = compute_confidence(present, RECEIPT_REQUIRED.len());

    let fecha_pago = str_field(value, "fechaPago")
        .ok_or_else(|| PipelineError::Validation("missing fechaPago".to_string()))
        .and_then(|s| parse_date(s).map_err(|e| PipelineError::Validation(e.to_string())))?;

    let tipo = match str_field(value, "tipo") {
        Some("liquidacion_final") => ReceiptType::LiquidacionFinal,
        _ => ReceiptType::Sueldo,
    };

    Ok(Receipt {
        meta: RecordMeta {
            file_id,
            file_name,
            processed_at: chrono::Utc::now(),
            confidence,
            needs_review: needs_review(confidence, any_missing, false),
        },
        tipo,
        nombre_empleado: str_field(value, "nombreEmpleado").unwrap_or("").to_string(),
        cuil_empleado: str_field(value, "cuilEmpleado").unwrap_or("").to_string(),
        legajo: str_field(value, "legajo").unwrap_or("").to_string(),
        cuit_empleador: str_field(value, "cuitEmpleador").unwrap_or("").to_string(),
        periodo_abonado: str_field(value, "periodoAbonado").unwrap_or("").to_string(),
        fecha_pago,
        subtotal_remuneraciones: amount_field(value, "subtotalRemuneraciones").unwrap_or(Amount::ZERO),
        subtotal_descuentos: amount_field(value, "subtotalDescuentos").unwrap_or(Amount::ZERO),
        total_neto: amount_field(value, "totalNeto").unwrap_or(Amount::ZERO),
        tarea_desempenada: str_field(value, "tareaDesempenada").map(str::to_string),
    })
}

/// Returns `None` when no usable dates can be extracted, so the caller can
/// route the file to `sin_procesar` (§4.6: "bank-statement extraction
/// skipped if dates can't be produced").
pub fn build_statement(value: &serde_json::Value, file_id: FileId, file_name: String) -> Option<Statement> {
    let fecha_desde = str_field(value, "fechaDesde").and_then(|s| parse_date(s).ok())?;
    let fecha_hasta = str_field(value, "fechaHasta").and_then(|s| parse_date(s).ok())?;

    Some(Statement {
        meta: RecordMeta {
            file_id,
            file_name,
            processed_at: chrono::Utc::now(),
            confidence: 1.0,
            needs_review: false,
        },
        banco: str_field(value, "banco").unwrap_or("").to_string(),
        numero_cuenta: str_field(value, "numeroCuenta").unwrap_or("").to_string(),
        fecha_desde,
        fecha_hasta,
        saldo_inicial: amount_field(value, "saldoInicial").unwrap_or(Amount::ZERO),
        saldo_final: amount_field(value, "saldoFinal").unwrap_or(Amount::ZERO),
        moneda: currency_field(value, "moneda"),
        cantidad_movimientos: value.get("cantidadMovimientos").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
    })
}
