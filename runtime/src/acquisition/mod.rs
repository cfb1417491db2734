//! Browser-free report acquisition.
//!
//! The job normally downloads the report through the page; this module
//! covers a report published at a direct URL.

pub mod http_client;
