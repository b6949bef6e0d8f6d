pub mod columns;
pub mod document_store;
pub mod error;
pub mod exchange_rate;
pub mod naming;
pub mod tabular_store;

pub use document_store::{DocumentStore, FileEntry};
pub use error::StoreError;
pub use exchange_rate::{ExchangeRateCache, Rate};
pub use naming::{sanitize_filename, FileClass};
pub use tabular_store::{CellUpdate, TabularStore};
