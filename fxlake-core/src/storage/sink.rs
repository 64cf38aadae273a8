//! Storage sinks: where serialized partitions end up.
//!
//! Both sinks replace the object at the target path wholesale, so a re-run
//! for the same partition overwrites instead of appending.

use super::credentials::Credentials;
use crate::error::EtlError;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default Google Cloud Storage JSON API endpoint.
pub const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Where `output_root` points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Local(PathBuf),
    Gcs { bucket: String, prefix: String },
}

impl StorageLocation {
    /// Classify an output root. `gs://` goes to GCS, `file://` and bare paths
    /// to the local filesystem; any other scheme is rejected.
    pub fn parse(root: &str) -> Result<Self, EtlError> {
        let root = root.trim();
        if root.is_empty() {
            return Err(EtlError::Config("output_root is empty".into()));
        }
        if root.starts_with("gs://") {
            let (bucket, prefix) = split_gcs_uri(root).map_err(|e| match e {
                EtlError::StorageWrite(msg) => EtlError::Config(msg),
                other => other,
            })?;
            return Ok(Self::Gcs {
                bucket,
                prefix: prefix.trim_end_matches('/').to_string(),
            });
        }
        if let Some(path) = root.strip_prefix("file://") {
            return Ok(Self::Local(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = root.split_once("://") {
            return Err(EtlError::Config(format!(
                "unsupported storage scheme '{scheme}://' in output_root"
            )));
        }
        Ok(Self::Local(PathBuf::from(root)))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Gcs { .. })
    }
}

/// Destination for one serialized file.
pub trait StorageSink: Send + Sync {
    /// Human-readable name of this sink.
    fn name(&self) -> &str;

    /// Create or replace the object at `path` with `bytes`.
    fn put(&self, path: &str, bytes: &[u8], credentials: &Credentials) -> Result<(), EtlError>;
}

/// Build the sink that matches a location.
pub fn sink_for(location: &StorageLocation, timeout: Duration) -> Box<dyn StorageSink> {
    match location {
        StorageLocation::Local(_) => Box::new(LocalSink),
        StorageLocation::Gcs { .. } => Box::new(GcsSink::new(DEFAULT_GCS_ENDPOINT, timeout)),
    }
}

// ── Local filesystem ────────────────────────────────────────────────

/// Writes to the local filesystem via temp file + rename.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSink;

impl StorageSink for LocalSink {
    fn name(&self) -> &str {
        "local"
    }

    fn put(&self, path: &str, bytes: &[u8], _credentials: &Credentials) -> Result<(), EtlError> {
        let path = Path::new(path.strip_prefix("file://").unwrap_or(path));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EtlError::StorageWrite(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let tmp_path = tmp_path_for(path);
        fs::write(&tmp_path, bytes).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            EtlError::StorageWrite(format!("failed to write {}: {e}", tmp_path.display()))
        })?;

        // Atomic rename
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            EtlError::StorageWrite(format!("atomic rename to {} failed: {e}", path.display()))
        })?;

        debug!(path = %path.display(), bytes = bytes.len(), "wrote local file");
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

// ── Google Cloud Storage ────────────────────────────────────────────

/// Single-request media upload to a GCS bucket.
#[derive(Debug, Clone)]
pub struct GcsSink {
    endpoint: String,
    timeout: Duration,
}

impl GcsSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

impl StorageSink for GcsSink {
    fn name(&self) -> &str {
        "gcs"
    }

    fn put(&self, path: &str, bytes: &[u8], credentials: &Credentials) -> Result<(), EtlError> {
        let token = match credentials {
            Credentials::BearerToken(token) => token,
            Credentials::Anonymous => {
                return Err(EtlError::Authentication(
                    "GCS uploads require a bearer token".into(),
                ))
            }
        };
        let (bucket, object) = split_gcs_uri(path)?;
        if object.is_empty() {
            return Err(EtlError::StorageWrite(format!("no object name in {path}")));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| EtlError::StorageWrite(format!("failed to build HTTP client: {e}")))?;

        let url = format!("{}/upload/storage/v1/b/{bucket}/o", self.endpoint);
        let resp = client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", object.as_str())])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .map_err(|e| EtlError::StorageWrite(format!("upload of {path} failed: {e}")))?;

        // Any non-2xx, 401/403 included, is a write failure.
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().unwrap_or_default();
            return Err(EtlError::StorageWrite(format!(
                "HTTP {status} uploading {path}: {detail}"
            )));
        }

        debug!(path, bytes = bytes.len(), "uploaded object");
        Ok(())
    }
}

/// Split `gs://bucket/some/object` into `("bucket", "some/object")`.
pub fn split_gcs_uri(uri: &str) -> Result<(String, String), EtlError> {
    let rest = uri
        .strip_prefix("gs://")
        .ok_or_else(|| EtlError::StorageWrite(format!("'{uri}' is not a gs:// URI")))?;
    let (bucket, object) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(EtlError::StorageWrite(format!("no bucket in '{uri}'")));
    }
    Ok((bucket.to_string(), object.to_string()))
}
