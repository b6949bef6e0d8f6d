//! Folder layout, canonical filenames, and filename sanitization (§6).

use adva_core::dates::month_name_es;
use chrono::NaiveDate;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Creditos,
    Debitos,
    Bancos,
    SinProcesar,
}

impl FileClass {
    pub fn segment(self) -> &'static str {
        match self {
            Self::Creditos => "creditos",
            Self::Debitos => "debitos",
            Self::Bancos => "bancos",
            Self::SinProcesar => "sin_procesar",
        }
    }
}

/// `<root>/<year>/<class>/<MM - MonthName>/` (§6). `sin_procesar` files are
/// filed by the date the pipeline processed them, not an extracted date.
pub fn folder_path(root: &str, date: NaiveDate, class: FileClass) -> String {
    use chrono::Datelike;
    format!(
        "{root}/{year}/{class}/{month:02} - {month_name}",
        root = root,
        year = date.year(),
        class = class.segment(),
        month = date.month(),
        month_name = month_name_es(date.month()),
    )
}

/// Strip characters the host filesystem disallows, collapse whitespace, and
/// remove diacritics (NFD decompose, drop combining marks) so filenames stay
/// portable across the document store's backends.
pub fn sanitize_filename(raw: &str) -> String {
    let replaced: String = raw.chars().map(|c| if c == '/' { '-' } else { c }).collect();
    let stripped: String = replaced.chars().filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*')).collect();
    let without_accents: String = stripped.nfd().filter(|c| !is_combining_mark(*c)).collect();
    let collapsed = without_accents.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim().to_string()
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF)
}

/// `direction` is the Spanish word (`"Recibida"`/`"Emitida"`), not the AFIP
/// type code — the type code is already on the row, not in the filename.
pub fn invoice_filename(direction: &str, nro_factura: &str, fecha_emision: NaiveDate, contraparte: &str, concepto: Option<&str>) -> String {
    let mut name = format!(
        "{date} - Factura {direction} - {nro} - {contraparte}",
        date = fecha_emision.format("%Y-%m-%d"),
    );
    if let Some(c) = concepto.filter(|c| !c.is_empty()) {
        name.push_str(" - ");
        name.push_str(c);
    }
    name.push_str(".pdf");
    sanitize_filename(&name)
}

/// `direction` is `"Enviado"`/`"Recibido"`; `contraparte` is the
/// beneficiary's name for a sent payment, the payer's for a received one.
pub fn payment_filename(direction: &str, fecha_pago: NaiveDate, contraparte: &str, concepto: Option<&str>) -> String {
    let mut name = format!("{date} - Pago {direction} - {contraparte}", date = fecha_pago.format("%Y-%m-%d"));
    if let Some(c) = concepto.filter(|c| !c.is_empty()) {
        name.push_str(" - ");
        name.push_str(c);
    }
    name.push_str(".pdf");
    sanitize_filename(&name)
}

pub fn receipt_filename(fecha_pago: NaiveDate, nombre_empleado: &str) -> String {
    sanitize_filename(&format!(
        "{period} - Recibo de Sueldo - {nombre}.pdf",
        period = fecha_pago.format("%Y-%m"),
        nombre = nombre_empleado,
    ))
}

pub fn statement_filename(fecha_desde: NaiveDate, banco: &str, numero_cuenta: &str, moneda: &str) -> String {
    sanitize_filename(&format!(
        "{period} - Resumen - {banco} - {cuenta} {moneda}.pdf",
        period = fecha_desde.format("%Y-%m"),
        banco = banco,
        cuenta = numero_cuenta,
        moneda = moneda,
    ))
}

pub fn withholding_filename(fecha_emision: NaiveDate, cuit_agente_retencion: &str) -> String {
    sanitize_filename(&format!(
        "{date} - Retencion {cuit}.pdf",
        date = fecha_emision.format("%Y-%m-%d"),
        cuit = cuit_agente_retencion,
    ))
}

pub fn sin_procesar_filename(original_name: &str) -> String {
    sanitize_filename(original_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_disallowed_chars_and_accents() {
        assert_eq!(sanitize_filename("Cía S.A. / Depto: \"Año\"?"), "Cia S.A. - Depto Ano");
    }

    #[test]
    fn sanitize_collapses_whitespace() {
        assert_eq!(sanitize_filename("a   b\tc"), "a b c");
    }

    #[test]
    fn folder_path_layout() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(
            folder_path("/root", date, FileClass::Creditos),
            "/root/2025/creditos/03 - Marzo"
        );
    }

    #[test]
    fn invoice_filename_shape() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        let name = invoice_filename("Recibida", "0001-00001234", date, "Proveedor SA", Some("Servicios"));
        assert_eq!(name, "2025-01-07 - Factura Recibida - 0001-00001234 - Proveedor SA - Servicios.pdf");
    }

    #[test]
    fn invoice_filename_omits_concepto_when_absent() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        let name = invoice_filename("Emitida", "0001-00001234", date, "Cliente SA", None);
        assert_eq!(name, "2025-01-07 - Factura Emitida - 0001-00001234 - Cliente SA.pdf");
    }

    #[test]
    fn payment_filename_shape() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        let name = payment_filename("Enviado", date, "Proveedor SA", None);
        assert_eq!(name, "2025-06-05 - Pago Enviado - Proveedor SA.pdf");
    }

    #[test]
    fn receipt_filename_shape() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let name = receipt_filename(date, "Juan Perez");
        assert_eq!(name, "2025-06 - Recibo de Sueldo - Juan Perez.pdf");
    }

    #[test]
    fn statement_filename_shape() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let name = statement_filename(date, "Galicia", "001-123456/7", "ARS");
        assert_eq!(name, "2025-06 - Resumen - Galicia - 001-123456-7 ARS.pdf");
    }
}
