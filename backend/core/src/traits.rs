use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PageWatchError;
use crate::types::{PageSnapshot, PageViewReport};

/// Reads the current reportable identity of the page.
///
/// Extraction is always live: implementations must never cache a snapshot
/// between calls.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self) -> Result<PageSnapshot, PageWatchError>;
}

/// Sends one report to the collector: "send JSON, get ok/fail".
#[async_trait]
pub trait ReportTransport: Send + Sync {
    /// Transport name (e.g., "http").
    fn name(&self) -> &str;

    /// Perform a single transmission attempt. Any non-success outcome is an error.
    async fn send(&self, report: &PageViewReport) -> Result<(), PageWatchError>;
}

#[async_trait]
impl<T: PageExtractor + ?Sized> PageExtractor for Arc<T> {
    async fn extract(&self) -> Result<PageSnapshot, PageWatchError> {
        (**self).extract().await
    }
}

#[async_trait]
impl<T: ReportTransport + ?Sized> ReportTransport for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn send(&self, report: &PageViewReport) -> Result<(), PageWatchError> {
        (**self).send(report).await
    }
}
