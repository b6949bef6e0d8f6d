//! Abstract spreadsheet/ledger store (§6). Concrete backend (Google Sheets,
//! ...) is an external collaborator; this crate defines the contract the
//! pipeline and matchers drive against.

use crate::error::StoreError;

/// One update to a range of cells, used by `batch_update` for TOCTOU-guarded
/// row rewrites (§4.11) and match-link writes.
#[derive(Debug, Clone)]
pub struct CellUpdate {
    pub sheet: String,
    pub range: String,
    pub values: Vec<Vec<String>>,
}

pub trait TabularStore: Send + Sync {
    /// Read a range as rows of string cells.
    fn get_values(&self, sheet: &str, range: &str) -> Result<Vec<Vec<String>>, StoreError>;

    /// Append rows to the end of a sheet, returns nothing (append-only).
    fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> Result<(), StoreError>;

    /// Apply a batch of cell-range updates atomically as seen by readers.
    fn batch_update(&self, updates: &[CellUpdate]) -> Result<(), StoreError>;

    /// Sort a sheet by a given column index, ascending.
    fn sort_sheet(&self, sheet: &str, column_index: usize) -> Result<(), StoreError>;
}
