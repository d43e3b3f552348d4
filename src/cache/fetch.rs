use async_trait::async_trait;
use reqwest::Client;

use super::CachedResponse;

/// The network side of the cache. Timeouts and connection failures are the
/// HTTP client's own; no extra timeout layer sits on top.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Resolve a URL to a response. Non-success statuses are still responses;
    /// only transport failures are errors.
    async fn fetch(&self, url: &str) -> Result<CachedResponse, String>;
}

pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, String> {
        let http = Client::builder()
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<CachedResponse, String> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| format!("GET {} failed: {}", url, e))?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = resp
            .bytes()
            .await
            .map_err(|e| format!("reading body of {} failed: {}", url, e))?
            .to_vec();
        Ok(CachedResponse {
            url: url.to_string(),
            status,
            content_type,
            body,
        })
    }
}
