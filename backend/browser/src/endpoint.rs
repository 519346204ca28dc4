//! Collector endpoint resolution.

use crate::dom::Document;
use crate::selector::SelectorList;

/// Compiled-in collector route used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/track-page-view";

/// Attribute on the embedding script tag that names the collector.
pub const ENDPOINT_ATTRIBUTE: &str = "data-endpoint";

/// Resolve the collector URL: the embedding script's `data-endpoint` wins, then
/// the configured endpoint, then [`DEFAULT_ENDPOINT`].
pub fn resolve_endpoint(doc: &Document, script: &SelectorList, configured: Option<&str>) -> String {
    doc.query_selector_all(script)
        .into_iter()
        .filter_map(|id| doc.element(id)?.attr(ENDPOINT_ATTRIBUTE))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .or_else(|| configured.map(str::trim).filter(|v| !v.is_empty()))
        .unwrap_or(DEFAULT_ENDPOINT)
        .to_string()
}
