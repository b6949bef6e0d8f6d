//! Local filesystem-backed `DocumentStore` and CSV-backed `TabularStore`
//! (§6: the cloud transport is an abstract external collaborator; this is
//! the concrete backend the bundled CLI drives against). Grounded in the
//! teacher's own local-file conventions — `visigrid-cli`'s `convert`/`diff`
//! subcommands read and write CSV directly via the `csv` crate rather than
//! a remote API, and `parse/statement_pdf.rs` takes a local PDF path.

use std::fs;
use std::path::{Path, PathBuf};

use adva_core::FileId;
use adva_store::document_store::{DocumentStore, FileEntry};
use adva_store::error::StoreError;
use adva_store::tabular_store::{CellUpdate, TabularStore};

pub struct FilesystemDocumentStore {
    root: PathBuf,
}

impl FilesystemDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root_id(&self) -> String {
        self.root.to_string_lossy().to_string()
    }
}

fn mime_for(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()) {
        Some(ext) if ext == "pdf" => "application/pdf".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

impl DocumentStore for FilesystemDocumentStore {
    fn list(&self, folder_id: &str) -> Result<Vec<FileEntry>, StoreError> {
        let dir = Path::new(folder_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let read_dir = fs::read_dir(dir).map_err(|e| StoreError::Io(e.to_string()))?;
        let mut out = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| StoreError::Io(e.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            out.push(FileEntry {
                file_id: FileId::new(path.to_string_lossy().to_string()),
                name,
                mime_type: mime_for(&path),
                folder_id: folder_id.to_string(),
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn download(&self, file_id: &FileId) -> Result<Vec<u8>, StoreError> {
        fs::read(&file_id.0).map_err(|e| StoreError::Io(format!("{}: {e}", file_id.0)))
    }

    fn move_file(&self, file_id: &FileId, dest_folder_id: &str, new_name: &str) -> Result<(), StoreError> {
        let dest_dir = Path::new(dest_folder_id);
        fs::create_dir_all(dest_dir).map_err(|e| StoreError::Io(e.to_string()))?;
        let dest = dest_dir.join(new_name);
        fs::rename(&file_id.0, &dest).map_err(|e| StoreError::Io(format!("{} -> {}: {e}", file_id.0, dest.display())))
    }

    fn get_or_create_folder(&self, parent_id: &str, name: &str) -> Result<String, StoreError> {
        let path = Path::new(parent_id).join(name);
        fs::create_dir_all(&path).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(path.to_string_lossy().to_string())
    }
}

/// One CSV file per sheet, under `root`. `get_values`/`append_rows` treat
/// every row (including the first) as data — the pipeline's row builders
/// don't emit a header row, matching the abstract tabular-store contract's
/// column-order-not-header-name guarantee (§6).
pub struct CsvTabularStore {
    root: PathBuf,
}

impl CsvTabularStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, sheet: &str) -> PathBuf {
        self.root.join(format!("{sheet}.csv"))
    }

    fn rewrite(&self, sheet: &str, rows: &[Vec<String>]) -> Result<(), StoreError> {
        let path = self.path(sheet);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(&path).map_err(|e| StoreError::Io(e.to_string()))?;
        for row in rows {
            wtr.write_record(row).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        wtr.flush().map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Parse the 1-indexed row number out of a single-row range like `"A5:Z5"`.
fn row_index_from_range(range: &str) -> Option<usize> {
    let last_part = range.split(':').next_back()?;
    let digits: String = last_part.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<usize>().ok()
}

impl TabularStore for CsvTabularStore {
    fn get_values(&self, sheet: &str, _range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let path = self.path(sheet);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_path(&path).map_err(|e| StoreError::Parse(e.to_string()))?;
        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| StoreError::Parse(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> Result<(), StoreError> {
        let path = self.path(sheet);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let file = fs::OpenOptions::new().create(true).append(true).open(&path).map_err(|e| StoreError::Io(e.to_string()))?;
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        for row in rows {
            wtr.write_record(row).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        wtr.flush().map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }

    fn batch_update(&self, updates: &[CellUpdate]) -> Result<(), StoreError> {
        for update in updates {
            let row_idx = row_index_from_range(&update.range)
                .ok_or_else(|| StoreError::Parse(format!("unrecognized range {:?}", update.range)))?;
            let mut rows = self.get_values(&update.sheet, "A:Z")?;
            while rows.len() < row_idx {
                rows.push(Vec::new());
            }
            if let Some(new_row) = update.values.first() {
                rows[row_idx - 1] = new_row.clone();
            }
            self.rewrite(&update.sheet, &rows)?;
        }
        Ok(())
    }

    fn sort_sheet(&self, sheet: &str, column_index: usize) -> Result<(), StoreError> {
        let mut rows = self.get_values(sheet, "A:Z")?;
        rows.sort_by(|a, b| a.get(column_index).cloned().unwrap_or_default().cmp(&b.get(column_index).cloned().unwrap_or_default()));
        self.rewrite(sheet, &rows)
    }
}
