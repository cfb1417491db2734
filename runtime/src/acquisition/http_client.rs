//! Async HTTP client wrapping reqwest.
//!
//! Fetches a report file from a direct URL. A single attempt per call;
//! failed runs are not retried.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

/// HTTP client for report downloads.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a new HTTP client with a standard Chrome user-agent.
    pub fn new(timeout_ms: u64) -> Self {
        let ua = "Mozilla/5.0 (X11; Linux x86_64) \
                  AppleWebKit/537.36 (KHTML, like Gecko) \
                  Chrome/131.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(ua)
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// Perform a single GET request.
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        let r = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;

        let status = r.status().as_u16();
        let final_url = r.url().to_string();
        let body = r
            .bytes()
            .await
            .with_context(|| format!("reading body of {url} failed"))?
            .to_vec();

        Ok(HttpResponse {
            final_url,
            status,
            body,
        })
    }

    /// Download `url` into `dir`, named after the URL's last path segment.
    pub async fn download_to(&self, url: &str, dir: &Path) -> Result<PathBuf> {
        let file_name = file_name_from_url(url)?;
        let resp = self.get(url).await?;
        if !(200..300).contains(&resp.status) {
            bail!("GET {url} returned HTTP {}", resp.status);
        }

        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, &resp.body)
            .await
            .with_context(|| format!("cannot write {}", path.display()))?;

        tracing::info!(
            "downloaded {} bytes from {} to {}",
            resp.body.len(),
            resp.final_url,
            path.display()
        );
        Ok(path)
    }
}

/// Last non-empty path segment of `url`.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).with_context(|| format!("invalid URL '{url}'"))?;
    let name = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.to_string());

    match name {
        Some(n) if n != "." && n != ".." => Ok(n),
        _ => bail!("URL '{url}' has no file name"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://example.com/files/IBOVDia_15-03-24.csv?x=1").unwrap(),
            "IBOVDia_15-03-24.csv"
        );
        assert_eq!(
            file_name_from_url("https://example.com/files/IBOV.csv/").unwrap(),
            "IBOV.csv"
        );
        assert!(file_name_from_url("https://example.com/").is_err());
        assert!(file_name_from_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_download_to_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reports/IBOVDia_15-03-24.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"a;b\n1;2\n".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = HttpClient::new(5_000);
        let url = format!("{}/reports/IBOVDia_15-03-24.csv", server.uri());
        let saved = client.download_to(&url, dir.path()).await.unwrap();

        assert_eq!(saved, dir.path().join("IBOVDia_15-03-24.csv"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"a;b\n1;2\n");
    }

    #[tokio::test]
    async fn test_download_to_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = HttpClient::new(5_000);
        let url = format!("{}/missing/IBOVDia_15-03-24.csv", server.uri());
        let err = client.download_to(&url, dir.path()).await.unwrap_err();

        assert!(err.to_string().contains("404"));
        assert!(!dir.path().join("IBOVDia_15-03-24.csv").exists());
    }
}
