//! fxlake core — daily exchange-rate pipeline.
//!
//! One invocation processes one logical date for one base currency:
//! - Extract: fetch the raw payload from the rate service (with fixed-delay retry)
//! - Transform: validate and normalize into a [`domain::RateTable`]
//! - Load: write a Snappy-compressed Parquet partition at
//!   `{output_root}/base_currency={BASE}/date={DATE}/data.parquet`
//!
//! Re-running a date overwrites the same partition, so runs are idempotent.

pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod storage;

#[cfg(test)]
mod http_stub;

pub use config::Config;
pub use domain::{CurrencyCode, RateQuery, RateRecord, RateTable, RawRateResponse};
pub use error::{EtlError, RunError, Stage};
pub use pipeline::Pipeline;
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
