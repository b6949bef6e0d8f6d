//! Fixed ledger sheet column layouts (§6). Column order is part of the
//! external contract with the tabular store; never reorder without a
//! migration.

pub const INVOICES_RECEIVED_COLUMNS: [&str; 18] = [
    "fechaEmision",
    "fileId",
    "fileName",
    "tipoComprobante",
    "nroFactura",
    "cuitEmisor",
    "razonSocialEmisor",
    "importeNeto",
    "importeIva",
    "importeTotal",
    "moneda",
    "concepto",
    "processedAt",
    "confidence",
    "needsReview",
    "matchedPagoFileId",
    "matchConfidence",
    "hasCuitMatch",
];

pub const INVOICES_ISSUED_COLUMNS: [&str; 18] = [
    "fechaEmision",
    "fileId",
    "fileName",
    "tipoComprobante",
    "nroFactura",
    "cuitReceptor",
    "razonSocialReceptor",
    "importeNeto",
    "importeIva",
    "importeTotal",
    "moneda",
    "concepto",
    "processedAt",
    "confidence",
    "needsReview",
    "matchedPagoFileId",
    "matchConfidence",
    "hasCuitMatch",
];

pub const PAYMENTS_COLUMNS: [&str; 16] = [
    "fechaPago",
    "fileId",
    "fileName",
    "banco",
    "importePagado",
    "moneda",
    "referencia",
    "cuitPagador",
    "nombrePagador",
    "cuitBeneficiario",
    "nombreBeneficiario",
    "concepto",
    "processedAt",
    "confidence",
    "needsReview",
    "matchedFacturaFileId",
];

pub const RECEIPTS_COLUMNS: [&str; 14] = [
    "fechaPago",
    "fileId",
    "fileName",
    "tipo",
    "nombreEmpleado",
    "cuilEmpleado",
    "legajo",
    "cuitEmpleador",
    "periodoAbonado",
    "subtotalRemuneraciones",
    "subtotalDescuentos",
    "totalNeto",
    "processedAt",
    "confidence",
];

pub const BANK_MOVEMENTS_COLUMNS: [&str; 12] = [
    "fecha",
    "fechaValor",
    "fileId",
    "fileName",
    "concepto",
    "codigo",
    "oficina",
    "credito",
    "debito",
    "detalle",
    "matchedFileId",
    "matchConfidence",
];

pub const WITHHOLDINGS_COLUMNS: [&str; 6] =
    ["fechaEmision", "fileId", "fileName", "cuitAgenteRetencion", "montoRetencion", "processedAt"];
