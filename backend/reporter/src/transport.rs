//! HTTP transport to the collector.

use std::time::Duration;

use async_trait::async_trait;
use pagewatch_core::{PageViewReport, PageWatchError, ReportTransport};
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs each report as JSON. One attempt per call; a non-2xx status is a failure.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, PageWatchError> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PageWatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PageWatchError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReportTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, report: &PageViewReport) -> Result<(), PageWatchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(report)
            .send()
            .await
            .map_err(|e| PageWatchError::Network(e.to_string()))?;

        let status = response.status();
        debug!(endpoint = %self.endpoint, status = status.as_u16(), "Collector responded");
        if status.is_success() {
            Ok(())
        } else {
            Err(PageWatchError::Transport {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pagewatch_core::PageSnapshot;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn report() -> PageViewReport {
        PageViewReport::from_snapshot(
            &PageSnapshot::new("https://a.test/", "Home", ""),
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn posts_camel_case_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/track-page-view"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(json!({
                "pageUrl": "https://a.test/",
                "pageTitle": "Home",
                "h1Text": "",
                "clickTime": "2026-03-01T12:00:00.000Z"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(format!("{}/api/track-page-view", server.uri())).unwrap();
        transport.send(&report()).await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri()).unwrap();
        let err = transport.send(&report()).await.unwrap_err();
        assert!(matches!(err, PageWatchError::Transport { status: 500 }));
        assert!(err.is_transmission());
    }

    #[tokio::test]
    async fn unreachable_collector_is_network_error() {
        let transport =
            HttpTransport::with_timeout("http://127.0.0.1:9/api/track-page-view", Duration::from_secs(2))
                .unwrap();
        let err = transport.send(&report()).await.unwrap_err();
        assert!(matches!(err, PageWatchError::Network(_)));
    }
}
