//! PERSISTING-stage idempotency guard (§2.14, §4.6): a FileId already
//! present in a sheet's rows is the sole protection against double-insert
//! on a re-scan.

use adva_core::FileId;

/// `rows` are raw sheet rows as returned by `TabularStore::get_values`;
/// `file_id_column` is the zero-based index of the `fileId` column.
pub fn already_persisted(rows: &[Vec<String>], file_id_column: usize, file_id: &FileId) -> bool {
    rows.iter().any(|row| row.get(file_id_column).map(|cell| cell == &file_id.0).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_existing_file_id() {
        let rows = vec![vec!["2025-01-01".into(), "abc123".into()], vec!["2025-01-02".into(), "def456".into()]];
        assert!(already_persisted(&rows, 1, &FileId::new("abc123")));
        assert!(!already_persisted(&rows, 1, &FileId::new("zzz")));
    }

    #[test]
    fn empty_sheet_never_matches() {
        assert!(!already_persisted(&[], 0, &FileId::new("abc123")));
    }
}
