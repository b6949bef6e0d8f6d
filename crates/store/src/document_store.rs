//! Abstract cloud file store (§6). The concrete backend (Google Drive, S3,
//! ...) is an external collaborator out of scope; this crate only defines
//! the contract the pipeline drives against.

use adva_core::FileId;

use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub file_id: FileId,
    pub name: String,
    pub mime_type: String,
    pub folder_id: String,
}

/// A document store: list files in a folder, download their bytes, move
/// them between folders, and get-or-create folders by path segment.
pub trait DocumentStore: Send + Sync {
    fn list(&self, folder_id: &str) -> Result<Vec<FileEntry>, StoreError>;
    fn download(&self, file_id: &FileId) -> Result<Vec<u8>, StoreError>;
    fn move_file(&self, file_id: &FileId, dest_folder_id: &str, new_name: &str) -> Result<(), StoreError>;
    fn get_or_create_folder(&self, parent_id: &str, name: &str) -> Result<String, StoreError>;
}
