//! Document pipeline orchestration (§4.6): FETCHING -> CLASSIFYING ->
//! EXTRACTING -> VALIDATING -> PERSISTING -> FILING -> DONE, with
//! error/quota/permanent branches to ERROR/SIN_PROCESAR.
//!
//! Mirrors the sequential fetch -> parse -> cross-check -> write shape of
//! `visigrid-cli/src/parse/statement_pdf.rs`, generalized from one file kind
//! to the five document classes this system recognizes.

use std::sync::Arc;

use adva_core::{dates::month_name_es, Direction, FileId};
use adva_llm::{response_parser::extract_json, LlmError, LlmGateway};
use adva_store::{document_store::FileEntry, naming, DocumentStore, FileClass, StoreError, TabularStore};
use chrono::Datelike;

use crate::error::PipelineError;
use crate::extract::{
    self, build_invoice, build_payment, build_receipt, build_statement, parse_classify_response, DocumentClass,
};
use crate::idempotency::already_persisted;
use crate::stage::{Outcome, Stage};
use crate::validation::{validate_invoice, validate_receipt};

const DEFAULT_MAX_RETRIES: u32 = 3;

pub struct DocumentPipeline {
    store: Arc<dyn DocumentStore>,
    sheets: Arc<dyn TabularStore>,
    llm: Arc<LlmGateway>,
    root_folder_id: String,
}

impl DocumentPipeline {
    pub fn new(store: Arc<dyn DocumentStore>, sheets: Arc<dyn TabularStore>, llm: Arc<LlmGateway>, root_folder_id: impl Into<String>) -> Self {
        Self { store, sheets, llm, root_folder_id: root_folder_id.into() }
    }

    pub fn process_file(&self, entry: &FileEntry) -> Outcome {
        match self.run(entry) {
            Ok(outcome) => outcome,
            Err((stage, e)) => Outcome::Error { file_id: entry.file_id.clone(), stage, reason: e.to_string() },
        }
    }

    fn run(&self, entry: &FileEntry) -> Result<Outcome, (Stage, PipelineError)> {
        let bytes = self
            .store
            .download(&entry.file_id)
            .map_err(|e| (Stage::Fetching, PipelineError::from(e)))?;

        let classify_text = self
            .llm
            .analyze_document(&bytes, &entry.mime_type, extract::CLASSIFY_PROMPT, DEFAULT_MAX_RETRIES)
            .map_err(|e| (Stage::Classifying, self.classify_failure(e)))?;
        let classify_json = extract_json(&classify_text).map_err(|e| (Stage::Classifying, PipelineError::from(e)))?;
        let classified = parse_classify_response(&classify_json);

        if classified.class == DocumentClass::Unrecognized {
            return Ok(self.send_to_sin_procesar(entry));
        }

        match classified.class {
            DocumentClass::Factura => self.process_invoice(entry, &bytes),
            DocumentClass::Pago => self.process_payment(entry, &bytes),
            DocumentClass::Recibo => self.process_receipt(entry, &bytes),
            DocumentClass::ResumenBancario => self.process_statement(entry, &bytes),
            DocumentClass::Unrecognized => unreachable!(),
        }
    }

    fn classify_failure(&self, e: LlmError) -> PipelineError {
        PipelineError::from(e)
    }

    fn process_invoice(&self, entry: &FileEntry, bytes: &[u8]) -> Result<Outcome, (Stage, PipelineError)> {
        let text = self
            .llm
            .analyze_document(bytes, &entry.mime_type, extract::EXTRACT_INVOICE_PROMPT, DEFAULT_MAX_RETRIES)
            .map_err(|e| (Stage::Extracting, PipelineError::from(e)))?;
        let json = extract_json(&text).map_err(|e| (Stage::Extracting, PipelineError::from(e)))?;

        let invoice = match build_invoice(&json, entry.file_id.clone(), entry.name.clone()) {
            Ok(inv) => inv,
            Err(_) => return Ok(self.send_to_sin_procesar(entry)),
        };

        let warnings = validate_invoice(&invoice);
        let needs_review = invoice.meta.needs_review || !warnings.is_empty();

        let direction = if invoice.cuit_emisor == adva_core::ADVA_CUIT {
            Direction::FacturaEmitida
        } else {
            Direction::FacturaRecibida
        };

        let sheet = match direction {
            Direction::FacturaEmitida => "facturas_emitidas",
            _ => "facturas_recibidas",
        };

        if self.persist_row(sheet, 1, &invoice.meta.file_id, invoice_row(&invoice))? {
            let direction_word = match direction {
                Direction::FacturaEmitida => "Emitida",
                _ => "Recibida",
            };
            let contraparte = match direction {
                Direction::FacturaEmitida => invoice.razon_social_receptor.as_deref().unwrap_or(&invoice.cuit_emisor),
                _ => invoice.razon_social_emisor.as_str(),
            };
            let name = naming::invoice_filename(direction_word, &invoice.nro_factura, invoice.fecha_emision, contraparte, invoice.concepto.as_deref());
            self.file_document(entry, invoice.fecha_emision, class_for(direction), &name)?;
        }

        Ok(Outcome::Persisted { file_id: entry.file_id.clone(), direction, needs_review })
    }

    fn process_payment(&self, entry: &FileEntry, bytes: &[u8]) -> Result<Outcome, (Stage, PipelineError)> {
        let text = self
            .llm
            .analyze_document(bytes, &entry.mime_type, extract::EXTRACT_PAYMENT_PROMPT, DEFAULT_MAX_RETRIES)
            .map_err(|e| (Stage::Extracting, PipelineError::from(e)))?;
        let json = extract_json(&text).map_err(|e| (Stage::Extracting, PipelineError::from(e)))?;

        let payment = match build_payment(&json, entry.file_id.clone(), entry.name.clone()) {
            Ok(p) => p,
            Err(_) => return Ok(self.send_to_sin_procesar(entry)),
        };

        let direction = if payment.cuit_pagador.as_deref() == Some(adva_core::ADVA_CUIT) {
            Direction::PagoEnviado
        } else {
            Direction::PagoRecibido
        };
        let sheet = match direction {
            Direction::PagoEnviado => "pagos_enviados",
            _ => "pagos_recibidos",
        };

        if self.persist_row(sheet, 1, &payment.meta.file_id, payment_row(&payment))? {
            let direction_word = match direction {
                Direction::PagoEnviado => "Enviado",
                _ => "Recibido",
            };
            let contraparte = match direction {
                Direction::PagoEnviado => payment.nombre_beneficiario.as_deref().or(payment.cuit_beneficiario.as_deref()).unwrap_or("Desconocido"),
                _ => payment.nombre_pagador.as_deref().or(payment.cuit_pagador.as_deref()).unwrap_or("Desconocido"),
            };
            let name = naming::payment_filename(direction_word, payment.fecha_pago, contraparte, payment.concepto.as_deref());
            self.file_document(entry, payment.fecha_pago, class_for(direction), &name)?;
        }

        Ok(Outcome::Persisted { file_id: entry.file_id.clone(), direction, needs_review: payment.meta.needs_review })
    }

    fn process_receipt(&self, entry: &FileEntry, bytes: &[u8]) -> Result<Outcome, (Stage, PipelineError)> {
        let text = self
            .llm
            .analyze_document(bytes, &entry.mime_type, extract::EXTRACT_RECEIPT_PROMPT, DEFAULT_MAX_RETRIES)
            .map_err(|e| (Stage::Extracting, PipelineError::from(e)))?;
        let json = extract_json(&text).map_err(|e| (Stage::Extracting, PipelineError::from(e)))?;

        let receipt = match build_receipt(&json, entry.file_id.clone(), entry.name.clone()) {
            Ok(r) => r,
            Err(_) => return Ok(self.send_to_sin_procesar(entry)),
        };
        let _warnings = validate_receipt(&receipt);

        if self.persist_row("recibos", 1, &receipt.meta.file_id, receipt_row(&receipt))? {
            let name = naming::receipt_filename(receipt.fecha_pago, &receipt.nombre_empleado);
            self.file_document(entry, receipt.fecha_pago, FileClass::Debitos, &name)?;
        }

        Ok(Outcome::Persisted { file_id: entry.file_id.clone(), direction: Direction::Recibo, needs_review: receipt.meta.needs_review })
    }

    fn process_statement(&self, entry: &FileEntry, bytes: &[u8]) -> Result<Outcome, (Stage, PipelineError)> {
        let text = self
            .llm
            .analyze_document(bytes, &entry.mime_type, extract::EXTRACT_STATEMENT_PROMPT, DEFAULT_MAX_RETRIES)
            .map_err(|e| (Stage::Extracting, PipelineError::from(e)))?;
        let json = extract_json(&text).map_err(|e| (Stage::Extracting, PipelineError::from(e)))?;

        let statement = match build_statement(&json, entry.file_id.clone(), entry.name.clone()) {
            Some(s) => s,
            None => return Ok(self.send_to_sin_procesar(entry)),
        };

        if self.persist_row("resumenes_bancarios", 1, &statement.meta.file_id, statement_row(&statement))? {
            let name = naming::statement_filename(statement.fecha_desde, &statement.banco, &statement.numero_cuenta, &statement.moneda.to_string());
            self.file_document(entry, statement.fecha_desde, FileClass::Bancos, &name)?;
        }

        Ok(Outcome::Persisted { file_id: entry.file_id.clone(), direction: Direction::ResumenBancario, needs_review: false })
    }

    /// Returns `Ok(true)` if the row was newly appended, `Ok(false)` if it
    /// was already present (idempotent no-op — caller should skip filing
    /// again only if it also wants to skip re-move; filing is itself
    /// idempotent so we always attempt it).
    fn persist_row(&self, sheet: &str, file_id_column: usize, file_id: &FileId, row: Vec<String>) -> Result<bool, (Stage, PipelineError)> {
        let existing = self
            .sheets
            .get_values(sheet, "A:Z")
            .map_err(|e| (Stage::Persisting, PipelineError::from(e)))?;
        if already_persisted(&existing, file_id_column, file_id) {
            return Ok(false);
        }
        self.sheets
            .append_rows(sheet, &[row])
            .map_err(|e| (Stage::Persisting, PipelineError::from(e)))?;
        Ok(true)
    }

    /// Moves `entry` into its dated folder under `new_name`, which the
    /// caller has already built from the extracted entity fields (§6) — or,
    /// for `sin_procesar`, the sanitized original name, since there's no
    /// entity to name the file after.
    fn file_document(&self, entry: &FileEntry, date: chrono::NaiveDate, class: FileClass, new_name: &str) -> Result<(), (Stage, PipelineError)> {
        let folder_id = self
            .ensure_folder(date, class)
            .map_err(|e| (Stage::Filing, PipelineError::from(e)))?;
        self.store
            .move_file(&entry.file_id, &folder_id, new_name)
            .map_err(|e| (Stage::Filing, PipelineError::from(e)))?;
        Ok(())
    }

    fn send_to_sin_procesar(&self, entry: &FileEntry) -> Outcome {
        let today = chrono::Utc::now().date_naive();
        let name = naming::sin_procesar_filename(&entry.name);
        if let Err(e) = self.file_document(entry, today, FileClass::SinProcesar, &name) {
            return Outcome::Error { file_id: entry.file_id.clone(), stage: e.0, reason: e.1.to_string() };
        }
        Outcome::SinProcesar { file_id: entry.file_id.clone(), reason: "unrecognized or unextractable document".to_string() }
    }

    fn ensure_folder(&self, date: chrono::NaiveDate, class: FileClass) -> Result<String, StoreError> {
        let year = date.year().to_string();
        let month_segment = format!("{:02} - {}", date.month(), month_name_es(date.month()));
        let year_id = self.store.get_or_create_folder(&self.root_folder_id, &year)?;
        let class_id = self.store.get_or_create_folder(&year_id, class.segment())?;
        self.store.get_or_create_folder(&class_id, &month_segment)
    }
}

fn class_for(direction: Direction) -> FileClass {
    match direction {
        Direction::FacturaEmitida | Direction::PagoRecibido => FileClass::Creditos,
        Direction::FacturaRecibida | Direction::PagoEnviado => FileClass::Debitos,
        Direction::ResumenBancario => FileClass::Bancos,
        _ => FileClass::Debitos,
    }
}

fn invoice_row(inv: &adva_core::Invoice) -> Vec<String> {
    vec![
        inv.fecha_emision.to_string(),
        inv.meta.file_id.to_string(),
        inv.meta.file_name.clone(),
        inv.tipo_comprobante.to_string(),
        inv.nro_factura.clone(),
        inv.cuit_emisor.clone(),
        inv.razon_social_emisor.clone(),
        inv.importe_neto.to_string(),
        inv.importe_iva.to_string(),
        inv.importe_total.to_string(),
        inv.moneda.to_string(),
        inv.concepto.clone().unwrap_or_default(),
        inv.meta.processed_at.to_rfc3339(),
        inv.meta.confidence.to_string(),
        inv.meta.needs_review.to_string(),
        String::new(),
        String::new(),
        String::new(),
    ]
}

fn payment_row(p: &adva_core::Payment) -> Vec<String> {
    vec![
        p.fecha_pago.to_string(),
        p.meta.file_id.to_string(),
        p.meta.file_name.clone(),
        p.banco.clone(),
        p.importe_pagado.to_string(),
        p.moneda.to_string(),
        p.referencia.clone().unwrap_or_default(),
        p.cuit_pagador.clone().unwrap_or_default(),
        p.nombre_pagador.clone().unwrap_or_default(),
        p.cuit_beneficiario.clone().unwrap_or_default(),
        p.nombre_beneficiario.clone().unwrap_or_default(),
        p.concepto.clone().unwrap_or_default(),
        p.meta.processed_at.to_rfc3339(),
        p.meta.confidence.to_string(),
        p.meta.needs_review.to_string(),
        String::new(),
    ]
}

fn receipt_row(r: &adva_core::Receipt) -> Vec<String> {
    vec![
        r.fecha_pago.to_string(),
        r.meta.file_id.to_string(),
        r.meta.file_name.clone(),
        format!("{:?}", r.tipo),
        r.nombre_empleado.clone(),
        r.cuil_empleado.clone(),
        r.legajo.clone(),
        r.cuit_empleador.clone(),
        r.periodo_abonado.clone(),
        r.subtotal_remuneraciones.to_string(),
        r.subtotal_descuentos.to_string(),
        r.total_neto.to_string(),
        r.meta.processed_at.to_rfc3339(),
        r.meta.confidence.to_string(),
    ]
}

fn statement_row(s: &adva_core::Statement) -> Vec<String> {
    vec![
        s.fecha_desde.to_string(),
        s.fecha_hasta.to_string(),
        s.meta.file_id.to_string(),
        s.meta.file_name.clone(),
        s.banco.clone(),
        s.numero_cuenta.clone(),
        s.saldo_inicial.to_string(),
        s.saldo_final.to_string(),
        s.moneda.to_string(),
        s.cantidad_movimientos.to_string(),
    ]
}
