//! S3 object store.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use super::{ObjectStore, PARQUET_CONTENT_TYPE};
use crate::config::AppConfig;

/// Uploads into one bucket with the credentials from [`AppConfig`].
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from explicit credentials; no ambient credential chain.
    pub async fn connect(config: &AppConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            Some(config.session_token.clone()),
            None,
            "carteira-environment",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        tracing::debug!(
            "S3 client ready for bucket {} in {}",
            config.bucket,
            config.region
        );

        Self {
            client: Client::new(&sdk_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, local: &Path, key: &str) -> Result<()> {
        let body = ByteStream::from_path(local)
            .await
            .with_context(|| format!("cannot read {}", local.display()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(PARQUET_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(&e)))?;

        Ok(())
    }

    fn location(&self, key: &str) -> String {
        s3_uri(&self.bucket, key)
    }
}

/// `s3://bucket/key`
pub fn s3_uri(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s3_uri() {
        assert_eq!(
            s3_uri("my-bucket", "input/carteira_teorica_IBOV_latest.parquet"),
            "s3://my-bucket/input/carteira_teorica_IBOV_latest.parquet"
        );
    }
}
