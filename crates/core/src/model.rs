//! Entity model (§3): the documents the pipeline extracts and the matcher
//! links together, plus the direction/confidence vocabulary shared across
//! crates.

use serde::{Deserialize, Serialize};

use crate::money::{Amount, Currency};

/// Opaque handle to a source file in the document store. Never parsed,
/// only compared and carried through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub String);

impl FileId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction a document is classified into, relative to the reference
/// organization's CUIT (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    FacturaEmitida,
    FacturaRecibida,
    PagoEnviado,
    PagoRecibido,
    ResumenBancario,
    Recibo,
    Unrecognized,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FacturaEmitida => "factura_emitida",
            Self::FacturaRecibida => "factura_recibida",
            Self::PagoEnviado => "pago_enviado",
            Self::PagoRecibido => "pago_recibido",
            Self::ResumenBancario => "resumen_bancario",
            Self::Recibo => "recibo",
            Self::Unrecognized => "unrecognized",
        };
        write!(f, "{s}")
    }
}

/// Confidence tier attached to a match (§3). Cross-currency matches are
/// capped one tier down from what the raw signals would otherwise earn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchConfidence {
    Low,
    Medium,
    High,
}

impl MatchConfidence {
    /// Cap a confidence one tier down for a cross-currency match (§4.7: HIGH
    /// -> MEDIUM, MEDIUM -> LOW; LOW stays LOW).
    pub fn capped_for_cross_currency(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium => Self::Low,
            Self::Low => Self::Low,
        }
    }
}

impl std::fmt::Display for MatchConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        };
        write!(f, "{s}")
    }
}

/// Fields every persisted entity carries regardless of type (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMeta {
    pub file_id: FileId,
    pub file_name: String,
    pub processed_at: chrono::DateTime<chrono::Utc>,
    pub confidence: f64,
    pub needs_review: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceType {
    A,
    B,
    C,
    E,
    NC,
    ND,
}

impl std::fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::E => "E",
            Self::NC => "NC",
            Self::ND => "ND",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub meta: RecordMeta,
    pub tipo_comprobante: InvoiceType,
    pub nro_factura: String,
    pub fecha_emision: chrono::NaiveDate,
    pub cuit_emisor: String,
    pub razon_social_emisor: String,
    pub cuit_receptor: Option<String>,
    pub razon_social_receptor: Option<String>,
    pub importe_neto: Amount,
    pub importe_iva: Amount,
    pub importe_total: Amount,
    pub moneda: Currency,
    pub concepto: Option<String>,
    pub matched_pago_file_id: Option<FileId>,
    pub match_confidence: Option<MatchConfidence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub meta: RecordMeta,
    pub banco: String,
    pub fecha_pago: chrono::NaiveDate,
    pub importe_pagado: Amount,
    pub moneda: Currency,
    pub referencia: Option<String>,
    pub cuit_pagador: Option<String>,
    pub nombre_pagador: Option<String>,
    pub cuit_beneficiario: Option<String>,
    pub nombre_beneficiario: Option<String>,
    pub concepto: Option<String>,
    pub matched_factura_file_id: Option<FileId>,
    pub match_confidence: Option<MatchConfidence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptType {
    Sueldo,
    LiquidacionFinal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub meta: RecordMeta,
    pub tipo: ReceiptType,
    pub nombre_empleado: String,
    pub cuil_empleado: String,
    pub legajo: String,
    pub cuit_empleador: String,
    pub periodo_abonado: String,
    pub fecha_pago: chrono::NaiveDate,
    pub subtotal_remuneraciones: Amount,
    pub subtotal_descuentos: Amount,
    pub total_neto: Amount,
    pub tarea_desempenada: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub meta: RecordMeta,
    pub banco: String,
    pub numero_cuenta: String,
    pub fecha_desde: chrono::NaiveDate,
    pub fecha_hasta: chrono::NaiveDate,
    pub saldo_inicial: Amount,
    pub saldo_final: Amount,
    pub moneda: Currency,
    pub cantidad_movimientos: u32,
}

/// One line of a bank statement. Exactly one of `credito`/`debito` is set
/// (§3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankMovement {
    pub meta: RecordMeta,
    pub fecha: chrono::NaiveDate,
    pub fecha_valor: chrono::NaiveDate,
    pub concepto: String,
    pub codigo: String,
    pub oficina: String,
    pub credito: Option<Amount>,
    pub debito: Option<Amount>,
    pub detalle: String,
    pub matched_file_id: Option<FileId>,
}

impl BankMovement {
    /// `true` for credit movements (money in), `false` for debit (money out).
    /// Panics if the credito/debito invariant has been violated upstream.
    pub fn is_credit(&self) -> bool {
        match (&self.credito, &self.debito) {
            (Some(_), None) => true,
            (None, Some(_)) => false,
            other => panic!("bank movement must have exactly one of credito/debito, got {other:?}"),
        }
    }

    pub fn amount(&self) -> Amount {
        self.credito.or(self.debito).expect("exactly one of credito/debito must be set")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withholding {
    pub meta: RecordMeta,
    pub cuit_agente_retencion: String,
    pub fecha_emision: chrono::NaiveDate,
    pub monto_retencion: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_currency_cap_steps_down_one_tier() {
        assert_eq!(MatchConfidence::High.capped_for_cross_currency(), MatchConfidence::Medium);
        assert_eq!(MatchConfidence::Medium.capped_for_cross_currency(), MatchConfidence::Low);
        assert_eq!(MatchConfidence::Low.capped_for_cross_currency(), MatchConfidence::Low);
    }

    #[test]
    fn confidence_ordering() {
        assert!(MatchConfidence::High > MatchConfidence::Medium);
        assert!(MatchConfidence::Medium > MatchConfidence::Low);
    }

    #[test]
    fn direction_display_matches_spec_vocabulary() {
        assert_eq!(Direction::FacturaEmitida.to_string(), "factura_emitida");
        assert_eq!(Direction::Unrecognized.to_string(), "unrecognized");
    }

    #[test]
    #[should_panic]
    fn bank_movement_rejects_both_credit_and_debit() {
        let meta = RecordMeta {
            file_id: FileId::new("f1"),
            file_name: "f1.pdf".into(),
            processed_at: chrono::Utc::now(),
            confidence: 1.0,
            needs_review: false,
        };
        let mv = BankMovement {
            meta,
            fecha: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            fecha_valor: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            concepto: "x".into(),
            codigo: "01".into(),
            oficina: "001".into(),
            credito: Some(Amount::from_cents(100)),
            debito: Some(Amount::from_cents(100)),
            detalle: "x".into(),
            matched_file_id: None,
        };
        mv.is_credit();
    }
}
