use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

use crate::errors::StoreError;
use crate::observability::{REMOTE_FAILURES_TOTAL, REMOTE_REQUESTS_TOTAL, REMOTE_REQUEST_DURATION};
use crate::remote::RemoteStore;

pub const MASTER_KEY_HEADER: &str = "x-master-key";

/// HTTP client for a JSONBin-style service:
/// `GET {base}/b/{bin}/latest` and `PUT {base}/b/{bin}`.
#[derive(Clone)]
pub struct JsonBinClient {
    http: reqwest::Client,
    base_url: String,
}

impl fmt::Debug for JsonBinClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonBinClient").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl JsonBinClient {
    /// Build a client; the master key is attached to every request.
    pub fn new(base_url: &str, master_key: &str, timeout: Option<Duration>) -> Result<Self, StoreError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(StoreError::Configuration("remote base url is empty".into()));
        }
        if master_key.trim().is_empty() {
            return Err(StoreError::Configuration("remote master key is not set".into()));
        }

        let mut key = HeaderValue::from_str(master_key)
            .map_err(|e| StoreError::Configuration(format!("invalid master key: {e}")))?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(MASTER_KEY_HEADER), key);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder
            .build()
            .map_err(|e| StoreError::Configuration(format!("cannot build http client: {e}")))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        REMOTE_REQUESTS_TOTAL.inc();
        let timer = REMOTE_REQUEST_DURATION.start_timer();
        let result = match req.send().await {
            Ok(resp) if resp.status().is_success() => Ok(resp),
            Ok(resp) => {
                let status = resp.status();
                Err(StoreError::RemoteUnavailable(format!(
                    "request failed: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("")
                )))
            }
            Err(e) => Err(StoreError::RemoteUnavailable(e.to_string())),
        };
        timer.observe_duration();
        if result.is_err() {
            REMOTE_FAILURES_TOTAL.inc();
        }
        result
    }
}

#[async_trait]
impl RemoteStore for JsonBinClient {
    async fn fetch(&self, bin_id: &str) -> Result<Value, StoreError> {
        let url = format!("{}/b/{}/latest", self.base_url, bin_id);
        debug!(%url, "fetching bin");
        let resp = self.send(self.http.get(&url)).await?;
        let body = resp.json::<Value>().await.map_err(|e| {
            REMOTE_FAILURES_TOTAL.inc();
            StoreError::RemoteUnavailable(format!("invalid response body: {e}"))
        })?;
        Ok(body.get("record").cloned().unwrap_or(Value::Null))
    }

    async fn replace(&self, bin_id: &str, document: &Value) -> Result<(), StoreError> {
        let url = format!("{}/b/{}", self.base_url, bin_id);
        debug!(%url, "replacing bin");
        self.send(self.http.put(&url).json(document)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_returns_record_and_sends_master_key() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/b/bin-p/latest"))
            .and(header("X-Master-Key", "k-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "record": [{"id": 1, "name": "A"}],
                "metadata": {"id": "bin-p", "private": true}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = JsonBinClient::new(&server.uri(), "k-123", None)?;
        let record = client.fetch("bin-p").await?;
        assert_eq!(record, json!([{"id": 1, "name": "A"}]));
        Ok(())
    }

    #[tokio::test]
    async fn fetch_without_record_is_null() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/b/empty/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"metadata": {}})))
            .mount(&server)
            .await;

        let client = JsonBinClient::new(&server.uri(), "k", None)?;
        assert_eq!(client.fetch("empty").await?, Value::Null);
        Ok(())
    }

    #[tokio::test]
    async fn non_success_status_is_remote_unavailable() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = JsonBinClient::new(&server.uri(), "wrong", None)?;
        let err = client.fetch("bin-p").await.unwrap_err();
        assert!(matches!(err, StoreError::RemoteUnavailable(ref m) if m.contains("401")));
        Ok(())
    }

    #[tokio::test]
    async fn replace_puts_whole_document() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let doc = json!([{"id": 1, "name": "A"}, {"id": 2, "name": "B"}]);
        Mock::given(method("PUT"))
            .and(path("/b/bin-c"))
            .and(header("X-Master-Key", "k"))
            .and(body_json(doc.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"record": doc.clone()})))
            .expect(1)
            .mount(&server)
            .await;

        let client = JsonBinClient::new(&format!("{}/", server.uri()), "k", None)?;
        client.replace("bin-c", &doc).await?;
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_host_is_remote_unavailable() -> anyhow::Result<()> {
        let client = JsonBinClient::new("http://127.0.0.1:9", "k", Some(Duration::from_secs(2)))?;
        let err = client.replace("bin", &json!([])).await.unwrap_err();
        assert!(matches!(err, StoreError::RemoteUnavailable(_)));
        Ok(())
    }

    #[test]
    fn empty_master_key_is_configuration_error() {
        let err = JsonBinClient::new("https://api.jsonbin.io/v3", "  ", None).unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }
}
