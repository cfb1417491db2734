//! Publisher: write the Parquet artifact and upload it under two keys.
//!
//! The same local file is uploaded to a "latest" key that is overwritten on
//! every run, then to a dated archive key. The first failed upload aborts
//! the run; an earlier successful upload is left in place.

pub mod s3;

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use carteira_teorica::{ParquetWriter, ReportDate, ReportTable, ARTIFACT_EXTENSION};
use serde::Serialize;
use tracing::{error, info};

use crate::error::RunError;

/// Key prefix of the always-overwritten snapshot.
pub const LATEST_PREFIX: &str = "input";

/// Key prefix of the per-date archive.
pub const ARCHIVE_PREFIX: &str = "parquet";

/// Stem shared by artifact keys and the default local file.
pub const ARTIFACT_STEM: &str = "carteira_teorica";

/// Content type sent with every upload.
pub const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache.parquet";

/// Destination for uploaded artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `local` under `key`, replacing any existing object.
    async fn put_file(&self, local: &Path, key: &str) -> Result<()>;

    /// Human-readable location of `key`, for logs.
    fn location(&self, key: &str) -> String;
}

/// The two destination keys of one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactKeys {
    pub latest: String,
    pub archive: String,
}

impl ArtifactKeys {
    pub fn new(index: &str, report_date: &ReportDate) -> Self {
        Self {
            latest: format!("{LATEST_PREFIX}/{ARTIFACT_STEM}_{index}_latest.{ARTIFACT_EXTENSION}"),
            archive: format!(
                "{ARCHIVE_PREFIX}/{ARTIFACT_STEM}_{index}_{}.{ARTIFACT_EXTENSION}",
                report_date.compact()
            ),
        }
    }

    /// Upload order: latest first, then archive.
    pub fn in_upload_order(&self) -> [&str; 2] {
        [&self.latest, &self.archive]
    }
}

/// Default local artifact path.
pub fn default_artifact_path() -> PathBuf {
    PathBuf::from(format!("{ARTIFACT_STEM}.{ARTIFACT_EXTENSION}"))
}

/// What a successful publish produced.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub artifact: PathBuf,
    pub rows: usize,
    pub report_date: String,
    pub keys: ArtifactKeys,
}

/// Write `table` to `artifact_path` and upload it for `index`.
pub async fn publish(
    store: &dyn ObjectStore,
    table: &ReportTable,
    index: &str,
    artifact_path: &Path,
) -> Result<PublishReport, RunError> {
    ParquetWriter::write_to_file(table, artifact_path).map_err(|e| {
        error!("writing {} failed: {e}", artifact_path.display());
        RunError::Publish(format!("writing {}: {e}", artifact_path.display()))
    })?;

    let keys = ArtifactKeys::new(index, &table.report_date);

    for key in keys.in_upload_order() {
        let location = store.location(key);
        store.put_file(artifact_path, key).await.map_err(|e| {
            error!(
                "upload of {} to {location} failed: {e:#}",
                artifact_path.display()
            );
            RunError::Publish(format!("uploading to {location}: {e:#}"))
        })?;
        info!("uploaded {} to {location}", artifact_path.display());
    }

    Ok(PublishReport {
        artifact: artifact_path.to_path_buf(),
        rows: table.len(),
        report_date: table.report_date.compact(),
        keys,
    })
}
