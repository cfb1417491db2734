//! Startup configuration.
//!
//! Credentials and the destination bucket are read once from the environment
//! and handed to the components that need them. Nothing is cached globally.

use std::fmt;
use std::path::PathBuf;

use crate::error::RunError;

pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_BUCKET: &str = "S3_BUCKET_NAME";

/// Optional override for the browser download directory.
pub const ENV_DOWNLOAD_DIR: &str = "CARTEIRA_DOWNLOAD_DIR";

/// Every variable [`AppConfig::from_env`] requires, in report order.
pub const REQUIRED_VARS: [&str; 5] = [
    ENV_ACCESS_KEY_ID,
    ENV_SECRET_ACCESS_KEY,
    ENV_SESSION_TOKEN,
    ENV_REGION,
    ENV_BUCKET,
];

/// Object-storage credentials and destination.
#[derive(Clone)]
pub struct AppConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub region: String,
    pub bucket: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("access_key_id", &redact(&self.access_key_id))
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .finish()
    }
}

fn redact(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    format!("{visible}****")
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, RunError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    ///
    /// Blank values count as missing. The error lists every missing
    /// variable, not just the first.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RunError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut get = |key: &'static str| -> String {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => v,
                _ => {
                    missing.push(key);
                    String::new()
                }
            }
        };

        let config = AppConfig {
            access_key_id: get(ENV_ACCESS_KEY_ID),
            secret_access_key: get(ENV_SECRET_ACCESS_KEY),
            session_token: get(ENV_SESSION_TOKEN),
            region: get(ENV_REGION),
            bucket: get(ENV_BUCKET),
        };

        if !missing.is_empty() {
            return Err(RunError::Configuration(format!(
                "missing required environment variable(s): {}",
                missing.join(", ")
            )));
        }

        Ok(config)
    }
}

/// Which required variables are present, without their values.
pub fn presence_report<F>(lookup: F) -> Vec<(&'static str, bool)>
where
    F: Fn(&str) -> Option<String>,
{
    REQUIRED_VARS
        .iter()
        .map(|key| {
            let present = lookup(key).is_some_and(|v| !v.trim().is_empty());
            (*key, present)
        })
        .collect()
}

/// Resolve the download directory.
///
/// Priority: explicit flag, `CARTEIRA_DOWNLOAD_DIR`, `~/carteira-teorica`.
pub fn resolve_download_dir(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }

    if let Ok(env_dir) = std::env::var(ENV_DOWNLOAD_DIR) {
        if !env_dir.trim().is_empty() {
            return PathBuf::from(env_dir);
        }
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("carteira-teorica")
}
