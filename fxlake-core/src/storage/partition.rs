//! Hive-style partitioned Parquet output.
//!
//! Layout: `{output_root}/base_currency={BASE}/date={YYYY-MM-DD}/data.parquet`
//!
//! One file per (base_currency, date). Writes replace the file at that path,
//! so re-running a date reproduces the same partition rather than adding one.

use super::credentials::CredentialProvider;
use super::sink::StorageSink;
use crate::domain::{CurrencyCode, RateTable};
use crate::error::EtlError;
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::info;

/// File format suffix of every partition file.
pub const FORMAT: &str = "parquet";

/// The (base_currency, date) pair that names a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTarget {
    pub base_currency: CurrencyCode,
    pub date: NaiveDate,
}

impl PartitionTarget {
    pub fn new(base_currency: CurrencyCode, date: NaiveDate) -> Self {
        Self {
            base_currency,
            date,
        }
    }

    /// Path below the output root: `base_currency={BASE}/date={DATE}/data.parquet`
    pub fn relative_path(&self) -> String {
        format!(
            "base_currency={}/date={}/data.{FORMAT}",
            self.base_currency,
            self.date.format("%Y-%m-%d")
        )
    }

    /// Full path under `output_root`. A trailing `/` on the root is ignored.
    pub fn resolve(&self, output_root: &str) -> String {
        format!(
            "{}/{}",
            output_root.trim_end_matches('/'),
            self.relative_path()
        )
    }
}

/// Outcome of a successful partition write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub path: String,
    pub rows: usize,
    pub bytes: usize,
    /// blake3 hex digest of the written file.
    pub content_hash: String,
}

/// Serializes [`RateTable`]s and hands them to a [`StorageSink`].
pub struct PartitionWriter {
    output_root: String,
    sink: Box<dyn StorageSink>,
}

impl PartitionWriter {
    pub fn new(output_root: impl Into<String>, sink: Box<dyn StorageSink>) -> Self {
        Self {
            output_root: output_root.into(),
            sink,
        }
    }

    /// Resolve the storage path for one partition.
    pub fn resolve_path(&self, base_currency: &CurrencyCode, date: NaiveDate) -> String {
        PartitionTarget::new(base_currency.clone(), date).resolve(&self.output_root)
    }

    /// Write `table` to the partition for (`base_currency`, `date`).
    ///
    /// Credentials are acquired first; if that fails nothing is serialized.
    /// The partition is keyed by the logical `date`, which may differ from the
    /// date stamped on the records when the service echoes an earlier
    /// business day.
    pub fn write(
        &self,
        table: &RateTable,
        date: NaiveDate,
        base_currency: &CurrencyCode,
        credentials: &dyn CredentialProvider,
    ) -> Result<WriteResult, EtlError> {
        if table.base_currency() != base_currency {
            return Err(EtlError::Validation(format!(
                "table base currency {} does not match partition {base_currency}",
                table.base_currency()
            )));
        }

        let creds = credentials.credentials()?;
        let path = self.resolve_path(base_currency, date);
        info!(%path, sink = self.sink.name(), "writing partition");

        let bytes = encode_parquet(table)?;
        self.sink.put(&path, &bytes, &creds)?;

        let result = WriteResult {
            path,
            rows: table.len(),
            bytes: bytes.len(),
            content_hash: blake3::hash(&bytes).to_hex().to_string(),
        };
        info!(
            path = %result.path,
            rows = result.rows,
            bytes = result.bytes,
            hash = %result.content_hash,
            "partition written"
        );
        Ok(result)
    }
}

// ── Parquet encoding ────────────────────────────────────────────────

/// Build a DataFrame with the fixed column contract.
pub fn table_to_dataframe(table: &RateTable) -> Result<DataFrame, EtlError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| EtlError::StorageWrite("invalid epoch".into()))?;
    let records = table.records();

    let dates: Vec<i32> = records
        .iter()
        .map(|r| (r.date - epoch).num_days() as i32)
        .collect();
    let bases: Vec<&str> = records.iter().map(|r| r.base_currency.as_str()).collect();
    let codes: Vec<&str> = records.iter().map(|r| r.currency_code.as_str()).collect();
    let rates: Vec<f64> = records.iter().map(|r| r.rate).collect();

    let [date_col, base_col, code_col, rate_col] = RateTable::COLUMNS;
    DataFrame::new(vec![
        Column::new(date_col.into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| EtlError::StorageWrite(format!("date cast: {e}")))?,
        Column::new(base_col.into(), bases),
        Column::new(code_col.into(), codes),
        Column::new(rate_col.into(), rates),
    ])
    .map_err(|e| EtlError::StorageWrite(format!("dataframe creation: {e}")))
}

/// Serialize a table to Snappy-compressed Parquet bytes.
pub fn encode_parquet(table: &RateTable) -> Result<Vec<u8>, EtlError> {
    let mut df = table_to_dataframe(table)?;
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf)
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut df)
        .map_err(|e| EtlError::StorageWrite(format!("write parquet: {e}")))?;
    Ok(buf)
}
