pub mod dates;
pub mod error;
pub mod identifiers;
pub mod model;
pub mod money;
pub mod rate_limiter;
pub mod work_queue;

pub use error::CoreError;
pub use identifiers::{cuit_or_dni_match, extract_cuit, format_cuit, is_valid_cuit, normalize_cuit};
pub use model::*;
pub use money::{format_amount, parse_amount, Amount, Currency};

/// CUIT of the reference organization. Its position in a document (issuer,
/// receiver, payer, beneficiary) decides a document's direction (§3).
pub const ADVA_CUIT: &str = "30709076783";
