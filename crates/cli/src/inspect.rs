//! `adva inspect <file-id>` (§11): read-only debugging aid — print every
//! ledger row that mentions a file ID, either as its own record or as
//! someone else's match link. Grounded in `visigrid-cli/src/recon.rs`'s
//! `extract_kind` lookup-by-id helper, generalized across all six sheets.

use adva_store::tabular_store::TabularStore;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::CliError;

const SHEETS: &[&str] = &["facturas_recibidas", "facturas_emitidas", "pagos_enviados", "pagos_recibidos", "recibos", "retenciones", "bancos"];

#[derive(Debug, Serialize)]
pub struct InspectHit {
    pub sheet: String,
    pub row_index: usize,
    pub columns: Vec<usize>,
    pub row: Vec<String>,
}

pub fn cmd_inspect(config: &PipelineConfig, file_id: &str, json: bool) -> Result<Vec<InspectHit>, CliError> {
    let sheets = crate::local_store::CsvTabularStore::new(&config.ledger_dir);
    let mut hits = Vec::new();

    for sheet in SHEETS {
        let rows = sheets.get_values(sheet, "A:Z")?;
        for (row_index, row) in rows.iter().enumerate() {
            let columns: Vec<usize> = row.iter().enumerate().filter(|(_, cell)| cell.as_str() == file_id).map(|(i, _)| i).collect();
            if !columns.is_empty() {
                hits.push(InspectHit { sheet: sheet.to_string(), row_index, columns, row: row.clone() });
            }
        }
    }

    if json {
        if let Ok(text) = serde_json::to_string(&hits) {
            println!("{text}");
        }
    } else if hits.is_empty() {
        println!("no ledger row mentions {file_id}");
    } else {
        for hit in &hits {
            println!("{} row {} (matched columns {:?}):", hit.sheet, hit.row_index + 1, hit.columns);
            println!("  {}", hit.row.join(" | "));
        }
    }

    if hits.is_empty() {
        return Err(CliError::args(format!("no ledger row mentions file id {file_id}")));
    }
    Ok(hits)
}
