//! TOCTOU guard before writing a movement's `matchedFileId`/`detalle` (§4.11).

use adva_core::{Amount, FileId};
use sha2::{Digest, Sha256};

/// Snapshot of the fields a concurrent re-read compares against.
#[derive(Debug, Clone)]
pub struct RowSnapshot {
    pub fecha: chrono::NaiveDate,
    pub concepto: String,
    pub debito: Option<Amount>,
    pub credito: Option<Amount>,
    pub existing_matched_file_id: Option<FileId>,
    pub existing_detalle: String,
}

/// SHA-256 over the fields that must not have changed since the row was
/// read for matching.
pub fn row_hash(snapshot: &RowSnapshot) -> String {
    let mut hasher = Sha256::new();
    hasher.update(snapshot.fecha.to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(snapshot.concepto.as_bytes());
    hasher.update(b"\0");
    hasher.update(snapshot.debito.map(|a| a.cents().to_string()).unwrap_or_default().as_bytes());
    hasher.update(b"\0");
    hasher.update(snapshot.credito.map(|a| a.cents().to_string()).unwrap_or_default().as_bytes());
    hasher.update(b"\0");
    hasher.update(snapshot.existing_matched_file_id.as_ref().map(|f| f.0.as_str()).unwrap_or_default().as_bytes());
    hasher.update(b"\0");
    hasher.update(snapshot.existing_detalle.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `true` if the row is unchanged and safe to write: re-reads `current` and
/// compares its hash against the one computed when matching started.
pub fn guard_unchanged(hash_at_match_time: &str, current: &RowSnapshot) -> bool {
    row_hash(current) == hash_at_match_time
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> RowSnapshot {
        RowSnapshot {
            fecha: chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            concepto: "PAGO PROVEEDOR".into(),
            debito: Some(Amount::from_cents(10_000)),
            credito: None,
            existing_matched_file_id: None,
            existing_detalle: String::new(),
        }
    }

    #[test]
    fn unchanged_row_passes_guard() {
        let snap = snapshot();
        let hash = row_hash(&snap);
        assert!(guard_unchanged(&hash, &snap));
    }

    #[test]
    fn changed_detalle_fails_guard() {
        let snap = snapshot();
        let hash = row_hash(&snap);
        let mut changed = snap;
        changed.existing_detalle = "Pago Factura a X".into();
        assert!(!guard_unchanged(&hash, &changed));
    }

    #[test]
    fn changed_matched_file_id_fails_guard() {
        let snap = snapshot();
        let hash = row_hash(&snap);
        let mut changed = snap;
        changed.existing_matched_file_id = Some(FileId::new("other"));
        assert!(!guard_unchanged(&hash, &changed));
    }
}
