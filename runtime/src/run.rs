//! Run controller: acquire → load → publish, once, for one index.

use std::path::PathBuf;

use carteira_teorica::{load_report, ReportTable};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::acquisition::http_client::HttpClient;
use crate::download::{fetch_daily_report, DownloadOptions};
use crate::error::RunError;
use crate::publish::{publish, ObjectStore, PublishReport};
use crate::renderer::BrowserLauncher;

/// Index published when none is given.
pub const DEFAULT_INDEX: &str = "IBOV";

const HTTP_TIMEOUT_MS: u64 = 60_000;
const PREVIEW_ROWS: usize = 5;

/// Where the report comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSource {
    /// Drive the report page in a browser.
    Browser,
    /// Fetch the report from a direct URL.
    Url(String),
    /// Use a report already on disk.
    File(PathBuf),
}

/// Inputs of a single run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub index: String,
    pub source: ReportSource,
    pub download: DownloadOptions,
    pub artifact_path: PathBuf,
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The artifact was written and both uploads succeeded.
    Published {
        report: PathBuf,
        publish: PublishReport,
        finished_at: DateTime<Utc>,
    },
    /// The report file name carried no date; nothing was uploaded.
    NoReportDate {
        report: PathBuf,
        finished_at: DateTime<Utc>,
    },
}

/// Execute one run.
///
/// A report without a date in its name ends the run early with
/// [`RunOutcome::NoReportDate`]. Every other failure is returned as an error.
pub async fn run(
    plan: &RunPlan,
    launcher: &dyn BrowserLauncher,
    store: &dyn ObjectStore,
) -> Result<RunOutcome, RunError> {
    let report = acquire(plan, launcher).await?;
    info!("report file: {}", report.display());

    let table = match load_report(&report).map_err(RunError::from) {
        Ok(table) => table,
        Err(e) if e.is_soft() => {
            info!("{e}; nothing to publish");
            return Ok(RunOutcome::NoReportDate {
                report,
                finished_at: Utc::now(),
            });
        }
        Err(e) => {
            error!("loading {} failed: {e}", report.display());
            return Err(e);
        }
    };
    preview(&table);

    let published = publish(store, &table, &plan.index, &plan.artifact_path).await?;

    Ok(RunOutcome::Published {
        report,
        publish: published,
        finished_at: Utc::now(),
    })
}

async fn acquire(plan: &RunPlan, launcher: &dyn BrowserLauncher) -> Result<PathBuf, RunError> {
    match &plan.source {
        ReportSource::Browser => fetch_daily_report(launcher, &plan.index, &plan.download).await,
        ReportSource::Url(url) => HttpClient::new(HTTP_TIMEOUT_MS)
            .download_to(url, &plan.download.download_dir)
            .await
            .map_err(|e| {
                error!("fetching {url} failed: {e:#}");
                RunError::Download(format!("{e:#}"))
            }),
        ReportSource::File(path) => {
            if path.is_file() {
                Ok(path.clone())
            } else {
                Err(RunError::Download(format!(
                    "report file not found: {}",
                    path.display()
                )))
            }
        }
    }
}

fn preview(table: &ReportTable) {
    info!(
        "{} rows for {} across {} columns",
        table.len(),
        table.report_date,
        table.columns.len()
    );
    let header: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    debug!("{}", header.join(" | "));
    for row in table.rows.iter().take(PREVIEW_ROWS) {
        let cells: Vec<String> = row.cells.iter().map(|c| c.to_string()).collect();
        debug!("{}", cells.join(" | "));
    }
}
