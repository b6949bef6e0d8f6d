pub mod amount_match;
pub mod bank_tier;
pub mod concepto;
pub mod error;
pub mod invoice_payment;
pub mod model;
pub mod orchestrator;
pub mod receipt_payment;
pub mod toctou;

pub use amount_match::RateLookup;
pub use error::ReconError;
pub use model::{MatchType, MovementMatch, Tier};
