//! Pipeline driver: extract → transform → load for one (date, base_currency).

use crate::config::Config;
use crate::data::{normalize, HttpRateFetcher, RateFetcher};
use crate::domain::RateQuery;
use crate::error::{EtlError, RunError, Stage};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::storage::{sink_for, CredentialProvider, PartitionWriter, WriteResult};
use chrono::NaiveDate;
use tracing::{error, info, info_span};

/// One configured pipeline. Holds no per-run state, so separate dates can
/// be run from separate threads against the same instance.
pub struct Pipeline {
    config: Config,
    fetcher: Box<dyn RateFetcher>,
    writer: PartitionWriter,
    credentials: Box<dyn CredentialProvider>,
    sleeper: Box<dyn Sleeper>,
}

impl Pipeline {
    /// Assemble a pipeline from explicit collaborators.
    pub fn new(
        config: Config,
        fetcher: Box<dyn RateFetcher>,
        writer: PartitionWriter,
        credentials: Box<dyn CredentialProvider>,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            fetcher,
            writer,
            credentials,
            sleeper,
        }
    }

    /// Production wiring: HTTP fetcher, sink chosen from `output_root`,
    /// credential provider chosen from config, real sleeps.
    pub fn from_config(config: Config) -> Self {
        let fetcher = HttpRateFetcher::new(config.api_base.clone(), config.request_timeout);
        let writer = PartitionWriter::new(
            config.output_root.clone(),
            sink_for(&config.location, config.request_timeout),
        );
        let credentials = config.credential_provider();
        Self::new(
            config,
            Box::new(fetcher),
            writer,
            credentials,
            Box::new(ThreadSleeper),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.config.retry
    }

    /// Where the partition for `date` will be written.
    pub fn resolve_path(&self, date: NaiveDate) -> String {
        self.writer.resolve_path(&self.config.base_currency, date)
    }

    /// Run the pipeline for a logical date with the configured base currency.
    pub fn run(&self, date: NaiveDate) -> Result<WriteResult, RunError> {
        let query = RateQuery::new(date, self.config.base_currency.clone());
        self.run_query(&query)
    }

    /// Run all three stages for one query. The first failure aborts the
    /// remaining stages; only the load stage has an external effect.
    pub fn run_query(&self, query: &RateQuery) -> Result<WriteResult, RunError> {
        let span = info_span!(
            "run",
            date = %query.date,
            base_currency = %query.base_currency
        );
        let _enter = span.enter();
        let fail = |stage: Stage| {
            move |source: EtlError| {
                let err = RunError {
                    stage,
                    date: query.date,
                    base_currency: query.base_currency.to_string(),
                    source,
                };
                error!(stage = %stage, error = %err.source, "pipeline run failed");
                err
            }
        };

        info!(fetcher = self.fetcher.name(), "extract");
        let raw = self
            .config
            .retry
            .run(self.sleeper.as_ref(), |attempt| {
                info!(attempt, "fetching rates");
                self.fetcher.fetch(query)
            })
            .map_err(fail(Stage::Extract))?;

        info!("transform");
        let table =
            normalize(&raw, query.date, &query.base_currency).map_err(fail(Stage::Transform))?;

        info!("load");
        let result = self
            .writer
            .write(
                &table,
                query.date,
                &query.base_currency,
                self.credentials.as_ref(),
            )
            .map_err(fail(Stage::Load))?;

        info!(path = %result.path, rows = result.rows, "pipeline run complete");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pipeline is shared across threads when dates run concurrently.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send_sync<T: Send + Sync>() {}
        require_send_sync::<Pipeline>();
        require_send_sync::<Config>();
        require_send_sync::<RateQuery>();
        require_send_sync::<crate::domain::RateTable>();
        require_send_sync::<crate::domain::RawRateResponse>();
        require_send_sync::<WriteResult>();
        require_send_sync::<RunError>();
    }
}
