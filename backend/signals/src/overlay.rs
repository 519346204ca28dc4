//! Overlay insertion source.
//!
//! Fires when a batch inserts a modal/dialog-like element, or an element that
//! merely contains one. The first such overlay also gets a scoped watch so its
//! internal changes keep firing; later overlays only fire on insertion.

use pagewatch_browser::{Document, HostEvent, MutationKind, MutationRecord, NodeId, SelectorList};
use pagewatch_core::TriggerSource;
use tracing::debug;

use crate::source::{SignalContext, SignalError, SignalSource};

#[derive(Debug)]
pub struct OverlayInsertionSource {
    marker: SelectorList,
    scope: Option<NodeId>,
}

impl OverlayInsertionSource {
    pub fn new(marker: &str) -> Result<Self, SignalError> {
        Ok(Self {
            marker: marker.parse()?,
            scope: None,
        })
    }

    /// The overlay under the scoped watch, once one has been found.
    pub fn watched(&self) -> Option<NodeId> {
        self.scope
    }

    fn qualifies(&self, doc: &Document, id: NodeId) -> bool {
        doc.is_element(id)
            && (self.marker.matches(doc, id)
                || doc.query_selector_within(id, &self.marker).is_some())
    }

    fn first_inserted_overlay(&self, doc: &Document, records: &[MutationRecord]) -> Option<NodeId> {
        records
            .iter()
            .flat_map(MutationRecord::added)
            .map(|spec| spec.id())
            .find(|id| self.qualifies(doc, *id))
    }
}

impl SignalSource for OverlayInsertionSource {
    fn name(&self) -> &str {
        "overlay_insertion"
    }

    fn on_event(&mut self, event: &HostEvent, ctx: &SignalContext<'_>) -> Result<(), SignalError> {
        let HostEvent::Mutations { records } = event else {
            return Ok(());
        };

        if let Some(scope) = self.scope {
            let content_changed = records.iter().any(|r| {
                r.kind() != MutationKind::Attributes && ctx.document.contains(scope, r.target())
            });
            if content_changed {
                ctx.triggers.fire(TriggerSource::OverlayContent)?;
            }
        }

        if let Some(overlay) = self.first_inserted_overlay(ctx.document, records) {
            ctx.triggers.fire(TriggerSource::OverlayInserted)?;
            if self.scope.is_none() {
                debug!(node = overlay, "Watching overlay content");
                self.scope = Some(overlay);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_browser::NodeSpec;
    use pagewatch_core::{TriggerBus, TriggerReceiver};

    fn doc() -> Document {
        Document::new(
            "https://a.test/",
            NodeSpec::element(1, "html").child(NodeSpec::element(2, "body")),
        )
        .unwrap()
    }

    fn insert(target: NodeId, node: NodeSpec) -> MutationRecord {
        MutationRecord::ChildList {
            target,
            added: vec![node],
            removed: vec![],
            before: None,
        }
    }

    fn deliver(
        source: &mut OverlayInsertionSource,
        doc: &mut Document,
        records: Vec<MutationRecord>,
        bus: &TriggerBus,
        rx: &mut TriggerReceiver,
    ) -> Vec<TriggerSource> {
        for r in &records {
            doc.apply(r).unwrap();
        }
        let tx = bus.sender();
        let ctx = SignalContext {
            document: doc,
            triggers: &tx,
        };
        source.on_event(&HostEvent::Mutations { records }, &ctx).unwrap();
        std::iter::from_fn(|| rx.try_recv().ok().map(|t| t.source)).collect()
    }

    fn source() -> OverlayInsertionSource {
        OverlayInsertionSource::new(".modal, [role=\"dialog\"]").unwrap()
    }

    #[test]
    fn first_overlay_fires_and_is_deep_watched() {
        let mut bus = TriggerBus::new();
        let mut rx = bus.take_rx().unwrap();
        let mut doc = doc();
        let mut src = source();

        let fired = deliver(
            &mut src,
            &mut doc,
            vec![insert(2, NodeSpec::element(10, "div").attr("class", "modal fade"))],
            &bus,
            &mut rx,
        );
        assert_eq!(fired, vec![TriggerSource::OverlayInserted]);
        assert_eq!(src.watched(), Some(10));

        let fired = deliver(
            &mut src,
            &mut doc,
            vec![insert(10, NodeSpec::element(11, "h1").child(NodeSpec::text(12, "Doc")))],
            &bus,
            &mut rx,
        );
        assert_eq!(fired, vec![TriggerSource::OverlayContent]);

        let fired = deliver(
            &mut src,
            &mut doc,
            vec![MutationRecord::CharacterData { target: 12, text: "Doc 2".into() }],
            &bus,
            &mut rx,
        );
        assert_eq!(fired, vec![TriggerSource::OverlayContent]);
    }

    #[test]
    fn attribute_changes_inside_overlay_are_ignored() {
        let mut bus = TriggerBus::new();
        let mut rx = bus.take_rx().unwrap();
        let mut doc = doc();
        let mut src = source();
        deliver(&mut src, &mut doc, vec![insert(2, NodeSpec::element(10, "div").attr("class", "modal"))], &bus, &mut rx);

        let fired = deliver(
            &mut src,
            &mut doc,
            vec![MutationRecord::Attributes {
                target: 10,
                name: "class".into(),
                value: Some("modal show".into()),
            }],
            &bus,
            &mut rx,
        );
        assert!(fired.is_empty());
    }

    #[test]
    fn wrapper_containing_modal_qualifies() {
        let mut bus = TriggerBus::new();
        let mut rx = bus.take_rx().unwrap();
        let mut doc = doc();
        let mut src = source();
        let wrapper = NodeSpec::element(20, "div")
            .child(NodeSpec::element(21, "section").attr("role", "dialog"));

        let fired = deliver(&mut src, &mut doc, vec![insert(2, wrapper)], &bus, &mut rx);
        assert_eq!(fired, vec![TriggerSource::OverlayInserted]);
        assert_eq!(src.watched(), Some(20));
    }

    #[test]
    fn only_first_overlay_gets_scoped_watch() {
        let mut bus = TriggerBus::new();
        let mut rx = bus.take_rx().unwrap();
        let mut doc = doc();
        let mut src = source();

        deliver(&mut src, &mut doc, vec![insert(2, NodeSpec::element(10, "div").attr("class", "modal"))], &bus, &mut rx);
        let fired = deliver(&mut src, &mut doc, vec![insert(2, NodeSpec::element(30, "div").attr("class", "modal"))], &bus, &mut rx);
        assert_eq!(fired, vec![TriggerSource::OverlayInserted]);
        assert_eq!(src.watched(), Some(10));

        // changes inside the second overlay are not scoped
        let fired = deliver(&mut src, &mut doc, vec![insert(30, NodeSpec::element(31, "p"))], &bus, &mut rx);
        assert!(fired.is_empty());
    }

    #[test]
    fn plain_insertions_are_ignored() {
        let mut bus = TriggerBus::new();
        let mut rx = bus.take_rx().unwrap();
        let mut doc = doc();
        let mut src = source();
        let fired = deliver(&mut src, &mut doc, vec![insert(2, NodeSpec::element(40, "div").attr("class", "toast"))], &bus, &mut rx);
        assert!(fired.is_empty());
        assert!(src.watched().is_none());
    }
}
