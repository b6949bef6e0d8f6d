//! `ExchangeRateCache::venta_rate`'s real HTTP fetch-and-cache path (§2.3),
//! exercised against a mocked provider the way the CUIT/amount validators
//! sit beside `exchange_rate.rs`'s own colocated tests, which only cover the
//! `seed()` bypass and never dial out.

use adva_store::{ExchangeRateCache, StoreError};
use chrono::NaiveDate;
use httpmock::prelude::*;
use serde_json::json;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn fetches_and_caches_rate_on_first_use_then_serves_from_cache() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/cotizaciones/dolar").query_param("fecha", "2025-06-01");
        then.status(200).json_body(json!({ "fecha": "2025-06-01", "compra": 850.0, "venta": 855.5 }));
    });

    let cache = ExchangeRateCache::new(server.base_url());
    let d = date("2025-06-01");

    assert_eq!(cache.venta_rate(d).unwrap(), 855.5);
    // Second call must be served from the cache, not a second request.
    assert_eq!(cache.venta_rate(d).unwrap(), 855.5);
    mock.assert_hits(1);
}

#[test]
fn missing_rate_surfaces_as_rate_unavailable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/cotizaciones/dolar");
        then.status(404);
    });

    let cache = ExchangeRateCache::new(server.base_url());
    let err = cache.venta_rate(date("2025-01-01")).unwrap_err();
    assert!(matches!(err, StoreError::RateUnavailable(d) if d == date("2025-01-01")));
}

#[test]
fn provider_error_surfaces_as_http_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/cotizaciones/dolar");
        then.status(503).body("upstream unavailable");
    });

    let cache = ExchangeRateCache::new(server.base_url());
    let err = cache.venta_rate(date("2025-03-10")).unwrap_err();
    assert!(matches!(err, StoreError::Http(503, _)));
}
