//! Delegated trigger-click source.

use std::time::Duration;

use pagewatch_browser::{HostEvent, SelectorList};
use pagewatch_core::TriggerSource;
use tracing::debug;

use crate::source::{SignalContext, SignalError, SignalSource};

/// Clicks on (or inside) known overlay-opening elements fire after a short
/// delay, giving the overlay time to render.
#[derive(Debug)]
pub struct TriggerClickSource {
    selector: SelectorList,
    delay: Duration,
}

impl TriggerClickSource {
    pub fn new(selectors: &[String], delay: Duration) -> Result<Self, SignalError> {
        Ok(Self {
            selector: selectors.join(", ").parse()?,
            delay,
        })
    }
}

impl SignalSource for TriggerClickSource {
    fn name(&self) -> &str {
        "trigger_click"
    }

    fn on_event(&mut self, event: &HostEvent, ctx: &SignalContext<'_>) -> Result<(), SignalError> {
        let HostEvent::Click { target } = event else {
            return Ok(());
        };
        if !ctx.document.exists(*target) {
            debug!(node = *target, "Click on unknown node");
            return Ok(());
        }
        if ctx.document.closest(*target, &self.selector).is_some() {
            ctx.triggers.fire_after(TriggerSource::TriggerClick, self.delay);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_browser::{Document, NodeSpec};
    use pagewatch_core::TriggerBus;

    fn doc() -> Document {
        let root = NodeSpec::element(1, "body")
            .child(
                NodeSpec::element(2, "a")
                    .attr("href", "#rpShowDynamicModalDocument-42")
                    .child(NodeSpec::element(3, "span").child(NodeSpec::text(4, "Open"))),
            )
            .child(NodeSpec::element(5, "a").attr("href", "/elsewhere"));
        Document::new("https://a.test/", root).unwrap()
    }

    fn source() -> TriggerClickSource {
        TriggerClickSource::new(
            &[
                "a[href^=\"#rpShowDynamicModalDocument-\"]".to_string(),
                "a.rp-search-result-heading".to_string(),
            ],
            Duration::from_millis(300),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn nested_click_fires_after_delay() {
        let mut bus = TriggerBus::new();
        let mut rx = bus.take_rx().unwrap();
        let doc = doc();
        let tx = bus.sender();
        let ctx = SignalContext {
            document: &doc,
            triggers: &tx,
        };

        let started = tokio::time::Instant::now();
        source().on_event(&HostEvent::Click { target: 4 }, &ctx).unwrap();
        assert!(rx.try_recv().is_err());

        let trigger = rx.recv().await.unwrap();
        assert_eq!(trigger.source, TriggerSource::TriggerClick);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_click_is_ignored() {
        let mut bus = TriggerBus::new();
        let mut rx = bus.take_rx().unwrap();
        let doc = doc();
        let tx = bus.sender();
        let ctx = SignalContext {
            document: &doc,
            triggers: &tx,
        };
        let mut src = source();
        src.on_event(&HostEvent::Click { target: 5 }, &ctx).unwrap();
        src.on_event(&HostEvent::Click { target: 99 }, &ctx).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }
}
