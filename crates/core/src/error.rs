use std::fmt;

/// Errors raised by the validators, money/date utilities, and rate limiter.
#[derive(Debug)]
pub enum CoreError {
    /// An amount string could not be parsed under Argentine number-format rules.
    AmountParse(String),
    /// A date string did not match any of the accepted formats.
    DateParse(String),
    /// A CUIT/CUIL failed the mod-11 checksum or has an invalid prefix.
    InvalidCuit(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmountParse(s) => write!(f, "cannot parse amount: {s:?}"),
            Self::DateParse(s) => write!(f, "cannot parse date: {s:?}"),
            Self::InvalidCuit(s) => write!(f, "invalid CUIT: {s:?}"),
        }
    }
}

impl std::error::Error for CoreError {}
