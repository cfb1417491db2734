//! Download orchestrator: drive the report page and wait for the file.
//!
//! The browser session is scoped to a single [`fetch_daily_report`] call and
//! is shut down on every exit path before the result is returned.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use carteira_teorica::{await_new_file, Baseline, WatchOptions, WatchOutcome};
use tracing::{error, info, warn};

use crate::error::RunError;
use crate::renderer::{BrowserLauncher, RenderContext, Renderer};

/// Base of the per-index daily composition page.
pub const REPORT_PAGE_BASE: &str = "https://sistemaswebb3-listados.b3.com.br/indexPage/day";

/// Id of the `<select>` that picks the report segment.
pub const SEGMENT_SELECT_ID: &str = "segment";

/// Segment option the published report is built from.
pub const SEGMENT_VALUE: &str = "2";

/// Visible text of the link that triggers the CSV download.
pub const DOWNLOAD_LINK_TEXT: &str = "Download";

/// How long to keep looking for a page element before giving up.
pub const DEFAULT_ELEMENT_WAIT: Duration = Duration::from_secs(10);

const ELEMENT_POLL: Duration = Duration::from_millis(250);
const NAVIGATION_TIMEOUT_MS: u64 = 60_000;

/// Canonical form of an index code: trimmed and upper-case.
///
/// The page, the downloaded file name and the object keys all use this form.
pub fn normalize_index(index: &str) -> String {
    index.trim().to_uppercase()
}

/// Daily report page for an index code.
pub fn report_page_url(index: &str) -> String {
    format!(
        "{REPORT_PAGE_BASE}/{}?language=pt-br",
        normalize_index(index)
    )
}

/// Where and how long to wait for the download.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub download_dir: PathBuf,
    pub watch: WatchOptions,
    pub element_wait: Duration,
    pub element_poll: Duration,
}

impl DownloadOptions {
    pub fn new(download_dir: PathBuf, max_wait: Duration) -> Self {
        Self {
            download_dir,
            watch: WatchOptions::with_max_wait(max_wait),
            element_wait: DEFAULT_ELEMENT_WAIT,
            element_poll: ELEMENT_POLL,
        }
    }
}

/// Download today's report for `index` and return the local file path.
pub async fn fetch_daily_report(
    launcher: &dyn BrowserLauncher,
    index: &str,
    options: &DownloadOptions,
) -> Result<PathBuf, RunError> {
    std::fs::create_dir_all(&options.download_dir).map_err(|e| {
        RunError::Download(format!(
            "cannot create download directory {}: {e}",
            options.download_dir.display()
        ))
    })?;

    info!("starting browser session");
    let mut renderer = launcher
        .launch(&options.download_dir)
        .await
        .map_err(|e| RunError::Download(format!("launching browser: {e:#}")))?;

    let index = normalize_index(index);
    let result = drive_page(renderer.as_ref(), &index, options).await;

    if let Err(e) = &result {
        error!("error while downloading the {index} report: {e}");
    }
    if let Err(e) = renderer.shutdown().await {
        warn!("failed to release browser session: {e:#}");
    }

    result
}

async fn drive_page(
    renderer: &dyn Renderer,
    index: &str,
    options: &DownloadOptions,
) -> Result<PathBuf, RunError> {
    let mut ctx = renderer
        .new_context()
        .await
        .map_err(|e| RunError::Download(format!("opening browser tab: {e:#}")))?;

    let result = trigger_download(ctx.as_mut(), index, options).await;

    if let Err(e) = ctx.close().await {
        warn!("failed to close browser tab: {e:#}");
    }
    result
}

async fn trigger_download(
    ctx: &mut dyn RenderContext,
    index: &str,
    options: &DownloadOptions,
) -> Result<PathBuf, RunError> {
    let url = report_page_url(index);
    info!("opening {url}");
    let nav = ctx
        .navigate(&url, NAVIGATION_TIMEOUT_MS)
        .await
        .map_err(|e| RunError::Download(format!("opening {url}: {e:#}")))?;
    info!("page loaded in {}ms", nav.load_time_ms);

    info!("capturing latest existing {index} report");
    let baseline = watch(&options.download_dir, index, None, options.watch)
        .await?
        .into_baseline();
    match &baseline {
        Baseline::Latest(p) => info!("baseline file: {}", p.display()),
        Baseline::Empty => info!("no previous {index} report in download directory"),
    }

    perform(
        ctx,
        PageAction::SelectOption {
            element_id: SEGMENT_SELECT_ID,
            value: SEGMENT_VALUE,
        },
        options,
    )
    .await?;
    perform(
        ctx,
        PageAction::ClickLink {
            text: DOWNLOAD_LINK_TEXT,
        },
        options,
    )
    .await?;
    info!("download link clicked, waiting for the download to complete");

    match watch(&options.download_dir, index, Some(baseline), options.watch).await? {
        WatchOutcome::Found(path) => Ok(path),
        _ => Err(RunError::Download(format!(
            "no new {index}*.csv appeared in {} within {}s",
            options.download_dir.display(),
            options.watch.max_wait.as_secs()
        ))),
    }
}

/// A page interaction that may have to wait for its element to render.
#[derive(Debug, Clone, Copy)]
enum PageAction<'a> {
    SelectOption { element_id: &'a str, value: &'a str },
    ClickLink { text: &'a str },
}

impl fmt::Display for PageAction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageAction::SelectOption { element_id, value } => {
                write!(f, "select option '{value}' in #{element_id}")
            }
            PageAction::ClickLink { text } => write!(f, "click link '{text}'"),
        }
    }
}

async fn perform(
    ctx: &dyn RenderContext,
    action: PageAction<'_>,
    options: &DownloadOptions,
) -> Result<(), RunError> {
    let deadline = Instant::now() + options.element_wait;

    loop {
        let done = match action {
            PageAction::SelectOption { element_id, value } => {
                ctx.select_option(element_id, value).await
            }
            PageAction::ClickLink { text } => ctx.click_link(text).await,
        }
        .map_err(|e| RunError::Download(format!("{action}: {e:#}")))?;

        if done {
            info!("{action}: done");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(RunError::Download(format!(
                "{action}: element not found after {}s",
                options.element_wait.as_secs()
            )));
        }
        tokio::time::sleep(options.element_poll).await;
    }
}

/// Run the blocking watcher off the async executor.
async fn watch(
    dir: &Path,
    prefix: &str,
    previous: Option<Baseline>,
    options: WatchOptions,
) -> Result<WatchOutcome, RunError> {
    let dir_owned = dir.to_path_buf();
    let prefix_owned = prefix.to_string();

    tokio::task::spawn_blocking(move || {
        await_new_file(&dir_owned, &prefix_owned, previous.as_ref(), options)
    })
    .await
    .map_err(|e| RunError::Download(format!("watcher task failed: {e}")))?
    .map_err(|e| RunError::Download(format!("watching {}: {e}", dir.display())))
}
