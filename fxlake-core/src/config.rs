//! Pipeline configuration.
//!
//! Uses `figment` for layered configuration: defaults -> TOML file -> environment.
//! Environment variables are prefixed with `FXLAKE_` and nest with `__`
//! (`FXLAKE_RETRY__DELAY_SECS=30`). The result is validated once into an
//! immutable [`Config`] that is passed explicitly to the pipeline.

use crate::data::DEFAULT_API_BASE;
use crate::domain::CurrencyCode;
use crate::error::EtlError;
use crate::retry::RetryPolicy;
use crate::storage::credentials::DEFAULT_TOKEN_ENV;
use crate::storage::{
    AnonymousCredentials, CredentialProvider, EnvTokenProvider, StorageLocation,
    TokenFileProvider,
};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for all settings.
pub const ENV_PREFIX: &str = "FXLAKE_";

/// Unvalidated settings as they come out of the layered sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Currency all rates are expressed against. Required.
    pub base_currency: Option<String>,
    /// Storage prefix for partitions (`gs://bucket/prefix` or a local path). Required.
    pub output_root: Option<String>,
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub retry: RetrySettings,
    pub credentials: CredentialSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_currency: None,
            output_root: None,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 30,
            retry: RetrySettings::default(),
            credentials: CredentialSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            delay_secs: policy.delay.as_secs(),
        }
    }
}

/// How the storage credential provider is chosen for remote roots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// Environment variable holding a bearer token.
    pub token_env: String,
    /// File holding a bearer token; takes precedence over `token_env`.
    pub token_file: Option<PathBuf>,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            token_file: None,
        }
    }
}

/// Validated, immutable configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_currency: CurrencyCode,
    pub output_root: String,
    pub location: StorageLocation,
    pub api_base: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub credentials: CredentialSettings,
}

impl Config {
    /// Load from defaults, an optional TOML file, then `FXLAKE_*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, EtlError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// Extract and validate from an already-assembled figment.
    pub fn from_figment(figment: &Figment) -> Result<Self, EtlError> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| EtlError::Config(e.to_string()))?;
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: Settings) -> Result<Self, EtlError> {
        let base_raw = non_empty(settings.base_currency, "base_currency")?;
        let base_currency = CurrencyCode::parse(&base_raw)
            .map_err(|e| EtlError::Config(format!("base_currency: {e}")))?;

        let output_root = non_empty(settings.output_root, "output_root")?;
        let location = StorageLocation::parse(&output_root)?;

        let api_base = settings.api_base.trim().to_string();
        if api_base.is_empty() {
            return Err(EtlError::Config("api_base is empty".into()));
        }
        if settings.retry.max_attempts == 0 {
            return Err(EtlError::Config("retry.max_attempts must be at least 1".into()));
        }

        Ok(Self {
            base_currency,
            output_root: output_root.trim().to_string(),
            location,
            api_base,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            retry: RetryPolicy::new(
                settings.retry.max_attempts,
                Duration::from_secs(settings.retry.delay_secs),
            ),
            credentials: settings.credentials,
        })
    }

    /// Credential provider matching the output location: anonymous for local
    /// paths, a token file or environment variable for remote roots.
    pub fn credential_provider(&self) -> Box<dyn CredentialProvider> {
        if !self.location.is_remote() {
            return Box::new(AnonymousCredentials);
        }
        match &self.credentials.token_file {
            Some(path) => Box::new(TokenFileProvider::new(path)),
            None => Box::new(EnvTokenProvider::new(&self.credentials.token_env)),
        }
    }
}

fn non_empty(value: Option<String>, key: &str) -> Result<String, EtlError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(EtlError::Config(format!(
            "missing required setting '{key}' (set it in the config file or {ENV_PREFIX}{})",
            key.to_ascii_uppercase()
        ))),
    }
}
