//! Domain types: queries, raw responses, normalized records and tables.

use crate::error::EtlError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// ISO-4217 style currency code: exactly three ASCII uppercase letters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse a code, trimming whitespace and uppercasing.
    pub fn parse(raw: &str) -> Result<Self, EtlError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(EtlError::Validation(format!(
                "'{raw}' is not a 3-letter currency code"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = EtlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// One invocation's unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateQuery {
    pub date: NaiveDate,
    pub base_currency: CurrencyCode,
}

impl RateQuery {
    pub fn new(date: NaiveDate, base_currency: CurrencyCode) -> Self {
        Self {
            date,
            base_currency,
        }
    }

    /// The logical date as the `YYYY-MM-DD` string used in URLs and paths.
    pub fn date_str(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Rate service payload, exactly as returned. Not yet validated.
///
/// A missing or `null` `rates` field decodes to an empty map and individual
/// `null` rates are kept as `None`, so both reach the transform stage and
/// fail validation there instead of being reported as fetch failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRateResponse {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rates: BTreeMap<String, Option<f64>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

/// A single normalized exchange rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub date: NaiveDate,
    pub base_currency: CurrencyCode,
    pub currency_code: String,
    pub rate: f64,
}

/// Validated, ordered set of records for one (date, base_currency).
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    records: Vec<RateRecord>,
}

impl RateTable {
    /// Output column contract. Downstream readers depend on this exact order.
    pub const COLUMNS: [&'static str; 4] = ["date", "base_currency", "currency_code", "rate"];

    /// Build a table, enforcing non-emptiness, a shared (date, base_currency)
    /// and the per-record invariants. Records are sorted by currency code.
    pub fn new(mut records: Vec<RateRecord>) -> Result<Self, EtlError> {
        let first = records
            .first()
            .ok_or_else(|| EtlError::Validation("rate table is empty".into()))?;
        let (date, base) = (first.date, first.base_currency.clone());

        for record in &records {
            if record.date != date || record.base_currency != base {
                return Err(EtlError::Validation(format!(
                    "record {} has ({}, {}), table has ({date}, {base})",
                    record.currency_code, record.date, record.base_currency
                )));
            }
            if !is_currency_code(&record.currency_code) {
                return Err(EtlError::Validation(format!(
                    "'{}' is not an uppercase 3-letter currency code",
                    record.currency_code
                )));
            }
            if !(record.rate.is_finite() && record.rate > 0.0) {
                return Err(EtlError::Validation(format!(
                    "rate for {} must be positive, got {}",
                    record.currency_code, record.rate
                )));
            }
        }

        records.sort_by(|a, b| a.currency_code.cmp(&b.currency_code));
        if let Some(pair) = records
            .windows(2)
            .find(|w| w[0].currency_code == w[1].currency_code)
        {
            return Err(EtlError::Validation(format!(
                "duplicate rate for {}",
                pair[0].currency_code
            )));
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[RateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for a constructed table; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn date(&self) -> NaiveDate {
        self.records[0].date
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.records[0].base_currency
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}
