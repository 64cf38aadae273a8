//! Raw payload → validated [`RateTable`].

use crate::domain::{CurrencyCode, RateRecord, RateTable, RawRateResponse};
use crate::error::EtlError;
use chrono::NaiveDate;
use tracing::{info, warn};

/// Turn a raw response into a table, one record per rate.
///
/// The date stamped on every record is the one echoed by the service when it
/// is present and parses as `YYYY-MM-DD`; otherwise `fallback_date`. An empty
/// `rates` map or a `null` rate is a hard validation failure.
pub fn normalize(
    raw: &RawRateResponse,
    fallback_date: NaiveDate,
    base_currency: &CurrencyCode,
) -> Result<RateTable, EtlError> {
    if raw.rates.is_empty() {
        warn!(date = %fallback_date, "rate service returned no rates");
        return Err(EtlError::Validation(format!(
            "no rate data available for {fallback_date}"
        )));
    }

    let date = resolve_date(raw.date.as_deref(), fallback_date);

    let records = raw
        .rates
        .iter()
        .map(|(code, &rate)| -> Result<RateRecord, EtlError> {
            let rate = rate
                .ok_or_else(|| EtlError::Validation(format!("rate for {code} is null")))?;
            Ok(RateRecord {
                date,
                base_currency: base_currency.clone(),
                currency_code: code.trim().to_ascii_uppercase(),
                rate,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let table = RateTable::new(records)?;
    info!(
        rows = table.len(),
        date = %date,
        columns = ?RateTable::COLUMNS,
        "normalized rates"
    );
    Ok(table)
}

/// Prefer the service's date; fall back to the logical date.
pub fn resolve_date(echoed: Option<&str>, fallback: NaiveDate) -> NaiveDate {
    match echoed {
        None => fallback,
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").unwrap_or_else(|e| {
            warn!(echoed = s, %fallback, error = %e, "unparseable service date, using logical date");
            fallback
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn usd() -> CurrencyCode {
        CurrencyCode::parse("USD").unwrap()
    }

    fn raw(date: Option<&str>, rates: &[(&str, f64)]) -> RawRateResponse {
        RawRateResponse {
            date: date.map(str::to_string),
            rates: rates.iter().map(|(k, v)| (k.to_string(), Some(*v))).collect(),
        }
    }

    #[test]
    fn stamps_base_and_echoed_date() {
        let table = normalize(
            &raw(Some("2025-07-01"), &[("EUR", 0.92), ("GBP", 0.79)]),
            d(2025, 7, 2),
            &usd(),
        )
        .unwrap();

        let rows: Vec<_> = table
            .records()
            .iter()
            .map(|r| (r.date, r.base_currency.as_str(), r.currency_code.as_str(), r.rate))
            .collect();
        assert_eq!(
            rows,
            vec![
                (d(2025, 7, 1), "USD", "EUR", 0.92),
                (d(2025, 7, 1), "USD", "GBP", 0.79),
            ]
        );
    }

    #[test]
    fn empty_rates_are_rejected() {
        let err = normalize(&raw(Some("2025-07-01"), &[]), d(2025, 7, 1), &usd()).unwrap_err();
        assert!(matches!(err, EtlError::Validation(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn missing_date_falls_back_to_logical_date() {
        let table = normalize(&raw(None, &[("EUR", 0.92), ("JPY", 144.1)]), d(2025, 7, 1), &usd())
            .unwrap();
        assert!(table.records().iter().all(|r| r.date == d(2025, 7, 1)));
    }

    #[test]
    fn unparseable_date_falls_back_to_logical_date() {
        let table =
            normalize(&raw(Some("July 1st"), &[("EUR", 0.92)]), d(2025, 7, 1), &usd()).unwrap();
        assert_eq!(table.date(), d(2025, 7, 1));
    }

    #[test]
    fn lowercase_codes_are_uppercased() {
        let table = normalize(&raw(None, &[("eur", 0.92)]), d(2025, 7, 1), &usd()).unwrap();
        assert_eq!(table.records()[0].currency_code, "EUR");
    }

    #[test]
    fn non_positive_rate_is_rejected() {
        let err = normalize(&raw(None, &[("EUR", 0.0)]), d(2025, 7, 1), &usd()).unwrap_err();
        assert!(matches!(err, EtlError::Validation(_)));
    }

    #[test]
    fn null_rate_is_rejected() {
        let mut raw = raw(None, &[("GBP", 0.79)]);
        raw.rates.insert("EUR".into(), None);
        let err = normalize(&raw, d(2025, 7, 1), &usd()).unwrap_err();
        assert!(matches!(err, EtlError::Validation(ref m) if m.contains("EUR")), "{err}");
        assert!(!err.is_retryable());
    }

    #[test]
    fn null_rates_payload_is_rejected() {
        let raw: RawRateResponse =
            serde_json::from_str(r#"{"date":"2025-07-01","rates":null}"#).unwrap();
        let err = normalize(&raw, d(2025, 7, 1), &usd()).unwrap_err();
        assert!(matches!(err, EtlError::Validation(_)));
    }

    proptest! {
        #[test]
        fn one_row_per_code_with_shared_date_and_base(
            rates in prop::collection::btree_map("[A-Z]{3}", 0.0001f64..10_000.0, 1..40)
        ) {
            let raw = RawRateResponse {
                date: Some("2024-02-29".into()),
                rates: rates.iter().map(|(k, v)| (k.clone(), Some(*v))).collect(),
            };
            let table = normalize(&raw, d(2024, 3, 1), &usd()).unwrap();

            prop_assert_eq!(table.len(), rates.len());
            prop_assert_eq!(RateTable::COLUMNS, ["date", "base_currency", "currency_code", "rate"]);

            let got: BTreeMap<String, f64> = table
                .records()
                .iter()
                .map(|r| (r.currency_code.clone(), r.rate))
                .collect();
            prop_assert_eq!(got, rates);
            for r in table.records() {
                prop_assert_eq!(r.date, d(2024, 2, 29));
                prop_assert_eq!(r.base_currency.as_str(), "USD");
            }
        }
    }
}
