//! Rate service client.
//!
//! Calls `GET {api_base}/{date}?base={base_currency}` and hands back the body
//! untouched. Every transport failure and every non-2xx status is reported as
//! [`EtlError::RemoteFetch`]; 4xx and 5xx are deliberately not told apart.

use crate::domain::{RateQuery, RawRateResponse};
use crate::error::EtlError;
use std::time::Duration;
use tracing::{info, warn};

/// Default public endpoint (Frankfurter, ECB reference rates).
pub const DEFAULT_API_BASE: &str = "https://api.frankfurter.app";

/// Source of raw exchange rates for a single (date, base_currency).
pub trait RateFetcher: Send + Sync {
    /// Human-readable name of this fetcher.
    fn name(&self) -> &str;

    /// Fetch the raw payload for one query. No validation of the rates.
    fn fetch(&self, query: &RateQuery) -> Result<RawRateResponse, EtlError>;
}

/// HTTP fetcher for Frankfurter-compatible APIs.
#[derive(Debug, Clone)]
pub struct HttpRateFetcher {
    api_base: String,
    timeout: Duration,
}

impl HttpRateFetcher {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Endpoint for a query; the base currency travels as the `base` query parameter.
    pub fn endpoint(&self, query: &RateQuery) -> String {
        format!("{}/{}", self.api_base, query.date_str())
    }

    fn client(&self) -> Result<reqwest::blocking::Client, EtlError> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("fxlake/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EtlError::RemoteFetch(format!("failed to build HTTP client: {e}")))
    }
}

impl RateFetcher for HttpRateFetcher {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch(&self, query: &RateQuery) -> Result<RawRateResponse, EtlError> {
        let endpoint = self.endpoint(query);
        info!(%endpoint, base_currency = %query.base_currency, "requesting rates");

        let resp = self
            .client()?
            .get(&endpoint)
            .query(&[("base", query.base_currency.as_str())])
            .send()
            .map_err(|e| {
                warn!(%endpoint, error = %e, "rate request failed");
                EtlError::RemoteFetch(format!("request to {endpoint} failed: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%endpoint, %status, "rate service returned an error status");
            return Err(EtlError::RemoteFetch(format!(
                "HTTP {status} from {endpoint}"
            )));
        }

        let body = resp
            .bytes()
            .map_err(|e| EtlError::RemoteFetch(format!("reading body from {endpoint}: {e}")))?;
        let raw = parse_body(&body)?;

        info!(
            echoed_date = raw.date.as_deref().unwrap_or("<none>"),
            rates = raw.rates.len(),
            "received rates"
        );
        Ok(raw)
    }
}

/// Decode a response body. Malformed JSON is a fetch failure, not a
/// validation failure, so it goes through the same retry path.
pub fn parse_body(body: &[u8]) -> Result<RawRateResponse, EtlError> {
    serde_json::from_slice(body)
        .map_err(|e| EtlError::RemoteFetch(format!("response format changed: {e}")))
}
