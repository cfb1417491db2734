//! Carteira Teórica: core library for the daily index-composition job.
//!
//! Watches a download directory for a freshly published report, loads the
//! exchange's CSV into a typed table, and writes it out as Parquet. Nothing
//! here touches a browser or the network; see the `carteira-runtime` crate.

pub mod loader;
pub mod storage;
pub mod types;
pub mod watcher;

pub use loader::{coerce_decimal, extract_date_token, load_report, parse_report};
pub use storage::{to_record_batch, ParquetWriter, ARTIFACT_EXTENSION};
pub use types::*;
pub use watcher::{await_new_file, latest_match, Baseline, WatchOptions, WatchOutcome};
