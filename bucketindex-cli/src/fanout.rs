//! Fan-out upload: one local file copied to every discovered bucket folder.

use bytes::Bytes;
use tracing::{error, info, warn};

use bucketindex_common::store::{file_basename, join_key, ObjectStore, StoreError};

use crate::enumerate::enumerate;

const FALLBACK_CONTENT_TYPE: &str = "text/html";

/// Per-target result of a single upload attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Done,
    /// The local file did not exist at upload time.
    MissingLocal,
}

/// Aggregated result of a fan-out run.
#[derive(Debug, Default)]
pub struct FanoutReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: Vec<String>,
}

impl FanoutReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Read `local_path` and write it to `key`. The file is read per call so a
/// fan-out observes the file as it exists at each attempt.
async fn put_local_file(
    store: &dyn ObjectStore,
    local_path: &str,
    key: &str,
    content_type: &str,
) -> Result<UploadOutcome, StoreError> {
    let data = match tokio::fs::read(local_path).await {
        Ok(data) => Bytes::from(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(UploadOutcome::MissingLocal);
        }
        Err(e) => return Err(StoreError::Io(e)),
    };

    store.put_object(key, data, content_type).await?;
    Ok(UploadOutcome::Done)
}

/// Upload one local file to one destination key.
///
/// Returns `Ok(false)` without raising when the local file is missing or
/// credentials are unavailable; both are logged and skippable. Other storage
/// errors propagate.
pub async fn upload_file(
    store: &dyn ObjectStore,
    local_path: &str,
    key: &str,
    content_type: &str,
) -> anyhow::Result<bool> {
    match put_local_file(store, local_path, key, content_type).await {
        Ok(UploadOutcome::Done) => {
            info!(path = %local_path, key = %key, "uploaded");
            Ok(true)
        }
        Ok(UploadOutcome::MissingLocal) => {
            warn!(path = %local_path, "local file not found, skipping");
            Ok(false)
        }
        Err(StoreError::Unauthorized) => {
            error!(key = %key, "credentials not available, skipping");
            Ok(false)
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("Upload failed for {}", key))),
    }
}

/// Upload `local_path` (under its base name) to every folder prefix in the
/// bucket plus the bucket root.
///
/// Per-target failures are collected into the report rather than aborting the
/// run, with one exception: the first `Unauthorized` stops the fan-out, since
/// every remaining target would fail the same way.
pub async fn copy_to_all_folders(
    store: &dyn ObjectStore,
    local_path: &str,
    ignore: &[String],
) -> anyhow::Result<FanoutReport> {
    let filename = file_basename(local_path);
    let content_type = mime_guess::from_path(local_path)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE);

    let mut folders = enumerate(store, "", ignore)
        .await
        .map_err(|e| anyhow::Error::new(e).context("Failed to enumerate bucket folders"))?;
    // The bucket root is always an upload target
    folders.push(String::new());

    info!(
        file = %filename,
        folders = folders.len(),
        "starting fan-out upload"
    );

    let mut report = FanoutReport::default();
    for folder in &folders {
        let key = join_key(folder, filename);
        report.attempted += 1;
        match put_local_file(store, local_path, &key, content_type).await {
            Ok(UploadOutcome::Done) => {
                info!(path = %local_path, key = %key, "uploaded");
                report.succeeded += 1;
            }
            Ok(UploadOutcome::MissingLocal) => {
                warn!(path = %local_path, key = %key, "local file not found, skipping");
                report.failed.push(key);
            }
            Err(StoreError::Unauthorized) => {
                error!(key = %key, "credentials not available, aborting remaining uploads");
                report.failed.push(key);
                break;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "upload failed, continuing");
                report.failed.push(key);
            }
        }
    }

    Ok(report)
}
