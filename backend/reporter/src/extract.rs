//! Live snapshot extraction from the shared page.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use pagewatch_browser::{
    AnchoredHeading, Document, GenericModal, OverlayStrategy, SelectorList, SharedPage,
};
use pagewatch_config::{OverlayConfig, OverlayStrategyConfig};
use pagewatch_core::{PageExtractor, PageSnapshot, PageWatchError};
use tracing::{trace, warn};

static FIRST_HEADING: Lazy<SelectorList> =
    Lazy::new(|| SelectorList::parse("h1").expect("valid heading selector"));

/// Plain-document fields, overridden by the first overlay strategy that
/// recognizes a visible overlay. Fields an overlay leaves empty keep their
/// plain-document value.
pub fn snapshot_of(doc: &Document, strategies: &[Box<dyn OverlayStrategy>]) -> PageSnapshot {
    let mut title = doc.title();
    let mut heading_text = doc
        .query_selector(&FIRST_HEADING)
        .map(|id| doc.text_content(id).trim().to_string())
        .unwrap_or_default();

    if let Some((strategy, fields)) = strategies
        .iter()
        .find_map(|s| s.extract(doc).map(|fields| (s.name(), fields)))
    {
        trace!(strategy, ?fields, "Overlay recognized");
        if let Some(heading) = fields.heading {
            heading_text = heading;
        }
        if let Some(overlay_title) = fields.title {
            title = overlay_title;
        }
    }

    PageSnapshot::new(doc.url(), title, heading_text)
}

/// Build strategies in configured order. Entries with invalid selectors are
/// logged and skipped.
pub fn build_strategies(configs: &[OverlayStrategyConfig]) -> Vec<Box<dyn OverlayStrategy>> {
    configs
        .iter()
        .filter_map(|cfg| {
            let built: Result<Box<dyn OverlayStrategy>, _> = match cfg {
                OverlayStrategyConfig::AnchoredHeading {
                    container,
                    heading,
                    strip,
                } => AnchoredHeading::new(container, heading, strip)
                    .map(|s| Box::new(s) as Box<dyn OverlayStrategy>),
                OverlayStrategyConfig::GenericModal {
                    visible,
                    candidates,
                    heading,
                    title,
                    strip,
                } => GenericModal::new(visible, candidates, heading, title, strip)
                    .map(|s| Box::new(s) as Box<dyn OverlayStrategy>),
            };
            match built {
                Ok(strategy) => Some(strategy),
                Err(e) => {
                    warn!(kind = cfg.kind(), error = %e, "Skipping overlay strategy");
                    None
                }
            }
        })
        .collect()
}

/// Reads the shared page on every call; nothing is cached.
pub struct LivePageExtractor {
    page: SharedPage,
    strategies: Vec<Box<dyn OverlayStrategy>>,
}

impl LivePageExtractor {
    pub fn new(page: SharedPage, strategies: Vec<Box<dyn OverlayStrategy>>) -> Self {
        Self { page, strategies }
    }

    pub fn from_config(page: SharedPage, overlay: &OverlayConfig) -> Self {
        Self::new(page, build_strategies(&overlay.strategies()))
    }
}

#[async_trait]
impl PageExtractor for LivePageExtractor {
    async fn extract(&self) -> Result<PageSnapshot, PageWatchError> {
        let page = self.page.read().await;
        Ok(snapshot_of(page.document(), &self.strategies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_browser::{NodeSpec, Page, PageLoad};
    use pagewatch_config::schema::default_overlay_strategies;

    fn page_with(body: NodeSpec) -> Document {
        let root = NodeSpec::element(1, "html")
            .child(
                NodeSpec::element(2, "head")
                    .child(NodeSpec::element(3, "title").child(NodeSpec::text(4, "  Home \n"))),
            )
            .child(body);
        Document::new("https://a.test/home", root).unwrap()
    }

    #[test]
    fn plain_document_fields() {
        let doc = page_with(NodeSpec::element(5, "body"));
        let snap = snapshot_of(&doc, &build_strategies(&default_overlay_strategies()));
        assert_eq!(snap, PageSnapshot::new("https://a.test/home", "Home", ""));
    }

    #[test]
    fn anchored_overlay_wins() {
        let body = NodeSpec::element(5, "body")
            .child(NodeSpec::element(6, "h1").child(NodeSpec::text(7, "Search")))
            .child(
                NodeSpec::element(8, "div")
                    .child(
                        NodeSpec::element(9, "div").attr("id", "pnlHeading").child(
                            NodeSpec::element(10, "h1")
                                .child(NodeSpec::text(11, "Document XYZ"))
                                .child(NodeSpec::element(12, "button").child(NodeSpec::text(13, "x"))),
                        ),
                    )
                    .child(NodeSpec::element(14, "div").attr("class", "rprtc-ajaxmodal")),
            );
        let doc = page_with(body);
        let snap = snapshot_of(&doc, &build_strategies(&default_overlay_strategies()));
        assert_eq!(snap.title, "Document XYZ");
        assert_eq!(snap.heading_text, "Document XYZ");
    }

    #[test]
    fn empty_anchored_heading_blocks_generic_fallback() {
        let body = NodeSpec::element(5, "body")
            .child(NodeSpec::element(6, "h1").child(NodeSpec::text(7, "Search")))
            .child(
                NodeSpec::element(8, "div")
                    .child(
                        NodeSpec::element(9, "div")
                            .attr("id", "pnlHeading")
                            .child(NodeSpec::element(10, "h1")),
                    )
                    .child(NodeSpec::element(14, "div").attr("class", "rprtc-ajaxmodal")),
            )
            .child(
                NodeSpec::element(20, "div")
                    .attr("class", "modal show")
                    .child(NodeSpec::element(21, "h1").child(NodeSpec::text(22, "Other"))),
            );
        let doc = page_with(body);
        let snap = snapshot_of(&doc, &build_strategies(&default_overlay_strategies()));
        assert_eq!(snap.title, "Home");
        assert_eq!(snap.heading_text, "Search");
    }

    #[test]
    fn invalid_strategy_is_skipped() {
        let configs = vec![
            OverlayStrategyConfig::AnchoredHeading {
                container: "div:first-child".into(),
                heading: "h1".into(),
                strip: "button".into(),
            },
            default_overlay_strategies().remove(1),
        ];
        let strategies = build_strategies(&configs);
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].name(), "generic_modal");
    }

    #[tokio::test]
    async fn live_extractor_sees_page_updates() {
        let page = Page::new(PageLoad {
            url: "https://a.test/".into(),
            document: NodeSpec::element(1, "body"),
        })
        .unwrap()
        .shared();
        let extractor = LivePageExtractor::from_config(page.clone(), &OverlayConfig::default());
        assert_eq!(extractor.extract().await.unwrap().url, "https://a.test/");

        page.write().await.document_mut().set_url("https://a.test/#doc");
        assert_eq!(extractor.extract().await.unwrap().url, "https://a.test/#doc");
    }
}
