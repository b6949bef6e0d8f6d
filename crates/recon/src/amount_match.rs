//! Shared same-currency/cross-currency amount comparison (§4.7, §4.8, §4.9).

use adva_core::{Amount, Currency};

const AMOUNT_EPSILON_CENTS: i64 = 1;

/// A function from (currency, date) to the USD->ARS "venta" rate. Kept
/// generic over a closure so matchers don't depend on `adva_store` directly
/// and tests can supply fixed rates without a network cache.
pub trait RateLookup {
    fn venta_rate(&self, date: chrono::NaiveDate) -> Option<f64>;
}

/// `true` if `a` (in `currency_a`) and `b` (in `currency_b`) represent the
/// same amount, same-currency exact (within 1 cent) or cross-currency
/// within `tolerance_pct` using the rate for `rate_date` (§6's
/// `usd_ars_tolerance_percent`). `None` if a cross-currency comparison was
/// needed but no rate was available.
pub fn amounts_match(
    a: Amount,
    currency_a: Currency,
    b: Amount,
    currency_b: Currency,
    rate_date: chrono::NaiveDate,
    rates: &dyn RateLookup,
    tolerance_pct: f64,
) -> Option<bool> {
    if currency_a == currency_b {
        return Some(a.approx_eq(&b, AMOUNT_EPSILON_CENTS));
    }

    let rate = rates.venta_rate(rate_date)?;
    let (usd_amount, ars_amount) = if currency_a == Currency::USD { (a, b) } else { (b, a) };
    let converted = usd_amount.scaled(rate);
    Some(converted.within_percent(&ars_amount, tolerance_pct))
}

pub fn is_cross_currency(a: Currency, b: Currency) -> bool {
    a != b
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRate(f64);
    impl RateLookup for FixedRate {
        fn venta_rate(&self, _date: chrono::NaiveDate) -> Option<f64> {
            Some(self.0)
        }
    }
    struct NoRate;
    impl RateLookup for NoRate {
        fn venta_rate(&self, _date: chrono::NaiveDate) -> Option<f64> {
            None
        }
    }

    fn d() -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn same_currency_exact_within_epsilon() {
        let a = Amount::from_cents(10000);
        let b = Amount::from_cents(10001);
        assert_eq!(amounts_match(a, Currency::ARS, b, Currency::ARS, d(), &NoRate, 5.0), Some(true));
    }

    #[test]
    fn cross_currency_within_band() {
        let usd = Amount::from_cents(10_00); // $10.00
        let ars = Amount::from_cents(855_000); // 8550.00 ARS, rate 855
        assert_eq!(amounts_match(usd, Currency::USD, ars, Currency::ARS, d(), &FixedRate(855.0), 5.0), Some(true));
    }

    #[test]
    fn cross_currency_rate_unavailable_is_none() {
        let usd = Amount::from_cents(10_00);
        let ars = Amount::from_cents(855_000);
        assert_eq!(amounts_match(usd, Currency::USD, ars, Currency::ARS, d(), &NoRate, 5.0), None);
    }

    #[test]
    fn cross_currency_outside_band_is_false() {
        let usd = Amount::from_cents(10_00);
        let ars = Amount::from_cents(1_000_000); // way off
        assert_eq!(amounts_match(usd, Currency::USD, ars, Currency::ARS, d(), &FixedRate(855.0), 5.0), Some(false));
    }

    #[test]
    fn narrower_configured_tolerance_rejects_a_band_the_default_would_accept() {
        let usd = Amount::from_cents(10_00);
        let ars = Amount::from_cents(880_000); // ~3% off rate 855
        assert_eq!(amounts_match(usd, Currency::USD, ars, Currency::ARS, d(), &FixedRate(855.0), 5.0), Some(true));
        assert_eq!(amounts_match(usd, Currency::USD, ars, Currency::ARS, d(), &FixedRate(855.0), 1.0), Some(false));
    }
}
