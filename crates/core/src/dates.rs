//! Date parsing and arithmetic utilities (§2.2).

use chrono::{Duration, NaiveDate};

use crate::error::CoreError;

/// Formats accepted for dates coming out of LLM extraction or sheet cells,
/// tried in order.
const FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d.%m.%Y"];

/// Parse a date string trying each accepted format in turn.
pub fn parse_date(s: &str) -> Result<NaiveDate, CoreError> {
    let s = s.trim();
    for fmt in FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(CoreError::DateParse(s.to_string()))
}

/// Spreadsheet "serial date" (days since 1899-12-30, the Excel/Sheets epoch).
pub fn from_serial(serial: i64) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial))
}

pub fn to_serial(date: NaiveDate) -> i64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    (date - epoch).num_days()
}

/// Signed day distance `b - a`.
pub fn day_distance(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days()
}

/// True if `date` falls in the inclusive window `[base + lo, base + hi]` days.
pub fn within_window(base: NaiveDate, date: NaiveDate, lo: i64, hi: i64) -> bool {
    let dist = day_distance(base, date);
    dist >= lo && dist <= hi
}

/// True if `date` falls in the *exclusive* window `(base + lo, base + hi)` days.
pub fn within_open_window(base: NaiveDate, date: NaiveDate, lo: i64, hi: i64) -> bool {
    let dist = day_distance(base, date);
    dist > lo && dist < hi
}

const MONTH_NAMES_ES: [&str; 12] = [
    "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio", "Julio", "Agosto", "Septiembre",
    "Octubre", "Noviembre", "Diciembre",
];

/// Spanish month name for folder naming (§6: `<MM - MonthName(Spanish)>`).
pub fn month_name_es(month: u32) -> &'static str {
    MONTH_NAMES_ES[((month as usize).saturating_sub(1)).min(11)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_iso_and_slash_formats() {
        assert_eq!(parse_date("2025-01-07").unwrap(), NaiveDate::from_ymd_opt(2025, 1, 7).unwrap());
        assert_eq!(parse_date("07/01/2025").unwrap(), NaiveDate::from_ymd_opt(2025, 1, 7).unwrap());
        assert_eq!(parse_date("07-01-2025").unwrap(), NaiveDate::from_ymd_opt(2025, 1, 7).unwrap());
    }

    #[test]
    fn reject_garbage_date() {
        assert!(parse_date("not a date").is_err());
    }

    #[test]
    fn serial_date_roundtrip() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        let serial = to_serial(d);
        assert_eq!(from_serial(serial).unwrap(), d);
    }

    #[test]
    fn day_distance_sign() {
        let a = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        assert_eq!(day_distance(a, b), 2);
        assert_eq!(day_distance(b, a), -2);
    }

    #[test]
    fn window_inclusive_bounds() {
        let base = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let at_edge = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(); // +15
        assert!(within_window(base, at_edge, 0, 15));
        assert!(!within_window(base, at_edge, 0, 14));
    }

    #[test]
    fn month_names_spanish() {
        assert_eq!(month_name_es(1), "Enero");
        assert_eq!(month_name_es(12), "Diciembre");
    }
}
