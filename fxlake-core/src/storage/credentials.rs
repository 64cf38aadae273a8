//! Storage credential providers.
//!
//! The writer asks for credentials once per invocation and never caches them.

use crate::error::EtlError;
use std::fmt;
use std::path::PathBuf;

/// Default environment variable holding a storage bearer token.
pub const DEFAULT_TOKEN_ENV: &str = "FXLAKE_STORAGE_TOKEN";

/// Credentials handed to a [`StorageSink`](super::StorageSink).
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// No authentication (local filesystem).
    Anonymous,
    /// OAuth2 access token sent as `Authorization: Bearer`.
    BearerToken(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => f.write_str("Anonymous"),
            Credentials::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
        }
    }
}

/// Something that can produce storage credentials on demand.
pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Result<Credentials, EtlError>;
}

/// Always yields [`Credentials::Anonymous`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousCredentials;

impl CredentialProvider for AnonymousCredentials {
    fn credentials(&self) -> Result<Credentials, EtlError> {
        Ok(Credentials::Anonymous)
    }
}

/// Reads a bearer token from an environment variable at acquisition time.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_ENV)
    }
}

impl CredentialProvider for EnvTokenProvider {
    fn credentials(&self) -> Result<Credentials, EtlError> {
        let token = std::env::var(&self.var).map_err(|e| {
            EtlError::Authentication(format!("cannot read token from ${}: {e}", self.var))
        })?;
        bearer(token, || format!("${} is empty", self.var))
    }
}

/// Reads a bearer token from a file (e.g. a mounted secret).
#[derive(Debug, Clone)]
pub struct TokenFileProvider {
    path: PathBuf,
}

impl TokenFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for TokenFileProvider {
    fn credentials(&self) -> Result<Credentials, EtlError> {
        let token = std::fs::read_to_string(&self.path).map_err(|e| {
            EtlError::Authentication(format!(
                "cannot read token file {}: {e}",
                self.path.display()
            ))
        })?;
        bearer(token, || format!("token file {} is empty", self.path.display()))
    }
}

fn bearer(raw: String, empty_msg: impl FnOnce() -> String) -> Result<Credentials, EtlError> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(EtlError::Authentication(empty_msg()));
    }
    Ok(Credentials::BearerToken(token.to_string()))
}
