use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    RateUnavailable(chrono::NaiveDate),
    Toctou(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateUnavailable(date) => write!(f, "no exchange rate available for {date}"),
            Self::Toctou(msg) => write!(f, "row changed since read, skipping update: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
