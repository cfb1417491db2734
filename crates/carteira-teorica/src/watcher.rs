//! Download-directory watcher.
//!
//! A browser download completes asynchronously, outside this process. The
//! watcher reconciles that with the filesystem by polling a directory for
//! `{prefix}*.csv` files and comparing the newest match against a baseline
//! captured before the download was triggered. Partial downloads
//! (`.csv.crdownload`) never match the extension filter.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crate::types::CarteiraResult;

/// Extension of a finished report download.
pub const REPORT_EXTENSION: &str = ".csv";

/// Default upper bound on a single wait.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

/// Default sleep between two directory listings.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Timing of a single wait.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WatchOptions {
    pub fn with_max_wait(max_wait: Duration) -> Self {
        Self {
            max_wait,
            ..Self::default()
        }
    }
}

/// What the directory held before the download was triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    /// No matching file existed.
    Empty,
    /// The newest matching file at the time.
    Latest(PathBuf),
}

/// Result of one wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The newest matching file, distinct from the baseline.
    Found(PathBuf),
    /// No baseline was given and the directory has no matching file.
    NoBaseline,
    /// The wait expired without a termination condition.
    NotFound,
}

impl WatchOutcome {
    /// Convert a baseline-capture result into the baseline for the next wait.
    ///
    /// Anything other than a found file means the directory held no match.
    pub fn into_baseline(self) -> Baseline {
        match self {
            WatchOutcome::Found(path) => Baseline::Latest(path),
            WatchOutcome::NoBaseline | WatchOutcome::NotFound => Baseline::Empty,
        }
    }
}

/// Newest `{prefix}*.csv` file in `dir`, if any.
///
/// Files are ordered by modification time; ties go to the lexically
/// greatest name so repeated listings agree.
pub fn latest_match(dir: &Path, prefix: &str) -> CarteiraResult<Option<PathBuf>> {
    let mut best: Option<(SystemTime, String, PathBuf)> = None;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(prefix) || !name.ends_with(REPORT_EXTENSION) {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            // Vanished between listing and stat, or not a regular file.
            _ => continue,
        };
        let modified = metadata.modified()?;

        let newer = match &best {
            None => true,
            Some((t, n, _)) => (modified, &name) > (*t, n),
        };
        if newer {
            best = Some((modified, name, entry.path()));
        }
    }

    Ok(best.map(|(_, _, path)| path))
}

/// Poll `dir` until a matching file distinct from `previous` shows up.
///
/// - With no `previous`, the first listing decides: the newest match is
///   returned as-is (even if stale), or [`WatchOutcome::NoBaseline`] when
///   there is none.
/// - With a `previous`, the call blocks until the newest match differs from
///   it, or `max_wait` elapses ([`WatchOutcome::NotFound`]).
///
/// The directory is always listed at least once, even with a zero `max_wait`.
/// Listing errors abort the wait.
pub fn await_new_file(
    dir: &Path,
    prefix: &str,
    previous: Option<&Baseline>,
    options: WatchOptions,
) -> CarteiraResult<WatchOutcome> {
    let started = Instant::now();

    loop {
        match latest_match(dir, prefix)? {
            Some(path) => {
                let is_previous = matches!(previous, Some(Baseline::Latest(p)) if *p == path);
                if !is_previous {
                    tracing::info!("matching file found: {}", path.display());
                    return Ok(WatchOutcome::Found(path));
                }
            }
            None if previous.is_none() => {
                tracing::debug!(
                    "no {prefix}*{REPORT_EXTENSION} file in {}; nothing to compare against",
                    dir.display()
                );
                return Ok(WatchOutcome::NoBaseline);
            }
            None => {}
        }

        let elapsed = started.elapsed();
        if elapsed >= options.max_wait {
            tracing::warn!(
                "no new {prefix}*{REPORT_EXTENSION} file in {} after {}s",
                dir.display(),
                elapsed.as_secs()
            );
            return Ok(WatchOutcome::NotFound);
        }

        let remaining = options.max_wait - elapsed;
        thread::sleep(options.poll_interval.min(remaining));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fast(max_wait_ms: u64) -> WatchOptions {
        WatchOptions {
            max_wait: Duration::from_millis(max_wait_ms),
            poll_interval: Duration::from_millis(10),
        }
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    fn set_mtime(path: &Path, secs_ago: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        let when = SystemTime::now() - Duration::from_secs(secs_ago);
        file.set_modified(when).unwrap();
    }

    #[test]
    fn test_empty_dir_without_previous_returns_no_baseline_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let started = Instant::now();
        let outcome = await_new_file(dir.path(), "IBOV", None, fast(5_000)).unwrap();
        assert_eq!(outcome, WatchOutcome::NoBaseline);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_stale_file_without_previous_is_returned_as_found() {
        let dir = tempfile::tempdir().unwrap();
        let stale = touch(dir.path(), "IBOVDia_14-03-24.csv");
        let outcome = await_new_file(dir.path(), "IBOV", None, fast(5_000)).unwrap();
        assert_eq!(outcome, WatchOutcome::Found(stale));
    }

    #[test]
    fn test_only_previous_present_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let stale = touch(dir.path(), "IBOVDia_14-03-24.csv");
        let baseline = Baseline::Latest(stale);

        let started = Instant::now();
        let outcome =
            await_new_file(dir.path(), "IBOV", Some(&baseline), fast(200)).unwrap();
        assert_eq!(outcome, WatchOutcome::NotFound);
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn test_empty_baseline_waits_for_first_file() {
        let dir = tempfile::tempdir().unwrap();
        let outcome =
            await_new_file(dir.path(), "IBOV", Some(&Baseline::Empty), fast(100)).unwrap();
        assert_eq!(outcome, WatchOutcome::NotFound);
    }

    #[test]
    fn test_file_written_during_wait_is_found() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("IBOV01-01-24.csv");
        let writer_target = target.clone();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            fs::write(writer_target, b"header\n").unwrap();
        });

        let outcome =
            await_new_file(dir.path(), "IBOV", Some(&Baseline::Empty), fast(5_000)).unwrap();
        writer.join().unwrap();
        assert_eq!(outcome, WatchOutcome::Found(target));
    }

    #[test]
    fn test_new_file_replaces_stale_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let stale = touch(dir.path(), "IBOVDia_14-03-24.csv");
        set_mtime(&stale, 3_600);
        let baseline = Baseline::Latest(stale);
        let fresh = touch(dir.path(), "IBOVDia_15-03-24.csv");

        let outcome =
            await_new_file(dir.path(), "IBOV", Some(&baseline), fast(1_000)).unwrap();
        assert_eq!(outcome, WatchOutcome::Found(fresh));
    }

    #[test]
    fn test_latest_match_filters_prefix_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "SMLLDia_15-03-24.csv");
        touch(dir.path(), "IBOVDia_15-03-24.csv.crdownload");
        touch(dir.path(), "IBOV_notes.txt");
        assert_eq!(latest_match(dir.path(), "IBOV").unwrap(), None);

        let report = touch(dir.path(), "IBOVDia_15-03-24.csv");
        assert_eq!(latest_match(dir.path(), "IBOV").unwrap(), Some(report));
    }

    #[test]
    fn test_latest_match_prefers_newest_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let older = touch(dir.path(), "IBOVDia_20-03-24.csv");
        set_mtime(&older, 7_200);
        let newer = touch(dir.path(), "IBOVDia_10-03-24.csv");
        set_mtime(&newer, 60);
        assert_eq!(latest_match(dir.path(), "IBOV").unwrap(), Some(newer));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(await_new_file(&missing, "IBOV", None, fast(100)).is_err());
    }

    #[test]
    fn test_into_baseline() {
        let path = PathBuf::from("/tmp/IBOV.csv");
        assert_eq!(
            WatchOutcome::Found(path.clone()).into_baseline(),
            Baseline::Latest(path)
        );
        assert_eq!(WatchOutcome::NoBaseline.into_baseline(), Baseline::Empty);
        assert_eq!(WatchOutcome::NotFound.into_baseline(), Baseline::Empty);
    }
}
