//! `carteira run`: download, convert and publish one day's report.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::config::{resolve_download_dir, AppConfig};
use crate::download::{normalize_index, DownloadOptions};
use crate::publish::default_artifact_path;
use crate::publish::s3::S3Store;
use crate::renderer::chromium::ChromiumLauncher;
use crate::run::{run, ReportSource, RunOutcome, RunPlan, DEFAULT_INDEX};

const DEFAULT_MAX_WAIT_SECS: u64 = 60;

/// Options of a single run.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Index code to download (e.g. IBOV, IBXX)
    #[arg(long, default_value = DEFAULT_INDEX)]
    pub index: String,

    /// Directory the browser downloads into
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Seconds to wait for the downloaded file
    #[arg(long, default_value_t = DEFAULT_MAX_WAIT_SECS)]
    pub max_wait: u64,

    /// Local path of the Parquet artifact
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Load an existing report instead of downloading one
    #[arg(long, conflicts_with = "from_url")]
    pub from_file: Option<PathBuf>,

    /// Fetch the report from a direct URL instead of the browser
    #[arg(long)]
    pub from_url: Option<String>,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            index: DEFAULT_INDEX.to_string(),
            download_dir: None,
            max_wait: DEFAULT_MAX_WAIT_SECS,
            output: None,
            headful: false,
            from_file: None,
            from_url: None,
        }
    }
}

impl RunArgs {
    /// Turn command-line options into a run plan.
    pub fn plan(&self) -> RunPlan {
        let source = match (&self.from_file, &self.from_url) {
            (Some(path), _) => ReportSource::File(path.clone()),
            (None, Some(url)) => ReportSource::Url(url.clone()),
            (None, None) => ReportSource::Browser,
        };

        RunPlan {
            index: normalize_index(&self.index),
            source,
            download: DownloadOptions::new(
                resolve_download_dir(self.download_dir.clone()),
                Duration::from_secs(self.max_wait),
            ),
            artifact_path: self.output.clone().unwrap_or_else(default_artifact_path),
        }
    }
}

/// Run the pipeline once and print a summary.
pub async fn run_cmd(args: &RunArgs, json: bool) -> Result<()> {
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("{e}");
        e
    })?;
    tracing::debug!("configuration: {config:?}");

    let plan = args.plan();
    tracing::info!(
        "run for {} (download dir {})",
        plan.index,
        plan.download.download_dir.display()
    );

    let store = S3Store::connect(&config).await;
    let launcher = ChromiumLauncher::new(!args.headful, None);

    let outcome = run(&plan, &launcher, &store).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match &outcome {
        RunOutcome::Published { report, publish, .. } => {
            println!("Published {} rows from {}", publish.rows, report.display());
            println!("  date:     {}", publish.report_date);
            println!("  artifact: {}", publish.artifact.display());
            for key in publish.keys.in_upload_order() {
                println!("  uploaded: {key}");
            }
        }
        RunOutcome::NoReportDate { report, .. } => {
            println!(
                "No date found in {}; nothing uploaded.",
                report.display()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            index: "ibov".into(),
            download_dir: Some(PathBuf::from("/tmp/carteira")),
            max_wait: 30,
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_defaults_to_browser() {
        let plan = args().plan();
        assert_eq!(plan.index, "IBOV");
        assert_eq!(plan.source, ReportSource::Browser);
        assert_eq!(plan.download.download_dir, PathBuf::from("/tmp/carteira"));
        assert_eq!(plan.download.watch.max_wait, Duration::from_secs(30));
        assert_eq!(plan.artifact_path, PathBuf::from("carteira_teorica.parquet"));
    }

    #[test]
    fn test_plan_prefers_file_source() {
        let mut a = args();
        a.from_file = Some(PathBuf::from("IBOVDia_15-03-24.csv"));
        a.from_url = Some("https://example.com/x.csv".into());
        assert_eq!(
            a.plan().source,
            ReportSource::File(PathBuf::from("IBOVDia_15-03-24.csv"))
        );
    }

    #[test]
    fn test_default_args() {
        let plan = RunArgs::default().plan();
        assert_eq!(plan.index, DEFAULT_INDEX);
        assert_eq!(plan.download.watch.max_wait, Duration::from_secs(60));
    }
}
