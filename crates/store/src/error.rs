use std::fmt;

/// Errors surfaced by the document store, tabular store, and exchange-rate
/// client boundaries (§6, §7 "storage" error kind: surfaced immediately,
/// never silently marks a file as processed).
#[derive(Debug)]
pub enum StoreError {
    Network(String),
    Http(u16, String),
    Parse(String),
    Io(String),
    NotFound(String),
    RateUnavailable(chrono::NaiveDate),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Http(code, msg) => write!(f, "HTTP {code}: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::RateUnavailable(date) => write!(f, "no exchange rate available for {date}"),
        }
    }
}

impl std::error::Error for StoreError {}
