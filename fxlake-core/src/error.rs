//! Structured error types for the rates pipeline.
//!
//! `EtlError` is the stage-level taxonomy; `RunError` wraps it with the
//! invocation context (stage, date, base currency) that the scheduler sees.

use chrono::NaiveDate;
use thiserror::Error;

/// Failure raised by a single pipeline component.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("remote fetch failed: {0}")]
    RemoteFetch(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("storage write failed: {0}")]
    StorageWrite(String),
}

impl EtlError {
    /// Only remote fetch failures are worth another attempt; everything else
    /// would fail the same way on the same logical date.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EtlError::RemoteFetch(_))
    }
}

/// Pipeline stage a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
    Load,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Load => "load",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed invocation, carrying enough context to act on.
#[derive(Debug, Error)]
#[error("{stage} stage failed for base_currency={base_currency} date={date}: {source}")]
pub struct RunError {
    pub stage: Stage,
    pub date: NaiveDate,
    pub base_currency: String,
    #[source]
    pub source: EtlError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_remote_fetch_is_retryable() {
        assert!(EtlError::RemoteFetch("timeout".into()).is_retryable());
        assert!(!EtlError::Validation("empty".into()).is_retryable());
        assert!(!EtlError::Authentication("no token".into()).is_retryable());
        assert!(!EtlError::StorageWrite("disk full".into()).is_retryable());
        assert!(!EtlError::Config("missing".into()).is_retryable());
    }

    #[test]
    fn run_error_names_stage_date_and_base() {
        let err = RunError {
            stage: Stage::Transform,
            date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            base_currency: "USD".into(),
            source: EtlError::Validation("no rate data".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("transform"));
        assert!(msg.contains("2025-07-01"));
        assert!(msg.contains("USD"));
        assert!(msg.contains("no rate data"));
    }
}
