//! USD/ARS exchange-rate cache (§2.3, §5, §6).
//!
//! Read-only integration: rates are fetched once per date and kept for at
//! least 24h (no eviction), so concurrent lookups for the same date never
//! re-fetch. Reads don't block each other; writes (a miss triggering a
//! fetch) take the lock only to insert.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy)]
pub struct Rate {
    pub compra: f64,
    pub venta: f64,
}

struct CacheEntry {
    rate: Rate,
    fetched_at: Instant,
}

#[derive(Deserialize)]
struct RateResponse {
    #[allow(dead_code)]
    fecha: String,
    compra: f64,
    venta: f64,
}

const MIN_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

pub struct ExchangeRateCache {
    http: reqwest::blocking::Client,
    provider_base: String,
    entries: RwLock<HashMap<NaiveDate, CacheEntry>>,
}

impl ExchangeRateCache {
    pub fn new(provider_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build HTTP client"),
            provider_base: provider_base.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// USD->ARS "venta" rate for `date`, fetching and caching on first use.
    pub fn venta_rate(&self, date: NaiveDate) -> Result<f64, StoreError> {
        if let Some(rate) = self.cached(date) {
            return Ok(rate.venta);
        }

        let url = format!("{}/cotizaciones/dolar", self.provider_base);
        let resp = self
            .http
            .get(&url)
            .query(&[("fecha", date.format("%Y-%m-%d").to_string())])
            .send()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        if status == 404 {
            return Err(StoreError::RateUnavailable(date));
        }
        if status >= 400 {
            return Err(StoreError::Http(status, resp.text().unwrap_or_default()));
        }

        let body: RateResponse = resp.json().map_err(|e| StoreError::Parse(e.to_string()))?;
        let rate = Rate { compra: body.compra, venta: body.venta };

        let mut entries = self.entries.write().expect("exchange rate cache poisoned");
        entries.entry(date).or_insert(CacheEntry { rate, fetched_at: Instant::now() });

        Ok(rate.venta)
    }

    fn cached(&self, date: NaiveDate) -> Option<Rate> {
        let entries = self.entries.read().expect("exchange rate cache poisoned");
        entries.get(&date).map(|e| e.rate)
    }

    /// For tests/warm-starts: seed a known rate without hitting the network.
    pub fn seed(&self, date: NaiveDate, rate: Rate) {
        let mut entries = self.entries.write().expect("exchange rate cache poisoned");
        entries.insert(date, CacheEntry { rate, fetched_at: Instant::now() });
    }

    /// Entries are retained at least [`MIN_RETENTION`]; nothing is ever
    /// proactively evicted (§5: "no eviction <24h"), so this is informational
    /// only — useful for tests asserting the retention contract holds.
    pub fn age_of(&self, date: NaiveDate) -> Option<Duration> {
        let entries = self.entries.read().expect("exchange rate cache poisoned");
        entries.get(&date).map(|e| e.fetched_at.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rate_is_served_without_network() {
        let cache = ExchangeRateCache::new("https://example.invalid");
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        cache.seed(date, Rate { compra: 850.0, venta: 855.5 });
        assert_eq!(cache.venta_rate(date).unwrap(), 855.5);
    }

    #[test]
    fn retention_contract_holds_immediately_after_seed() {
        let cache = ExchangeRateCache::new("https://example.invalid");
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        cache.seed(date, Rate { compra: 850.0, venta: 855.5 });
        assert!(cache.age_of(date).unwrap() < MIN_RETENTION);
    }
}
