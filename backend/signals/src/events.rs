//! Navigation, focus/visibility, and named host event sources.

use std::collections::HashSet;

use pagewatch_browser::{HostEvent, Visibility};
use pagewatch_core::TriggerSource;

use crate::source::{SignalContext, SignalError, SignalSource};

/// Back/forward navigation and fragment changes. `pushState` URL updates are
/// invisible here, as they are to a page listener.
#[derive(Debug, Default)]
pub struct NavigationSource;

impl SignalSource for NavigationSource {
    fn name(&self) -> &str {
        "navigation"
    }

    fn on_event(&mut self, event: &HostEvent, ctx: &SignalContext<'_>) -> Result<(), SignalError> {
        match event {
            HostEvent::PopState { .. } => ctx.triggers.fire(TriggerSource::PopState)?,
            HostEvent::HashChange { .. } => ctx.triggers.fire(TriggerSource::HashChange)?,
            _ => {}
        }
        Ok(())
    }
}

/// Window focus and the document becoming visible again.
#[derive(Debug, Default)]
pub struct FocusSource;

impl SignalSource for FocusSource {
    fn name(&self) -> &str {
        "focus"
    }

    fn on_event(&mut self, event: &HostEvent, ctx: &SignalContext<'_>) -> Result<(), SignalError> {
        match event {
            HostEvent::Focus => ctx.triggers.fire(TriggerSource::WindowFocus)?,
            HostEvent::VisibilityChange {
                state: Visibility::Visible,
            } => ctx.triggers.fire(TriggerSource::DocumentVisible)?,
            _ => {}
        }
        Ok(())
    }
}

/// Configured host-specific events such as `shown.bs.modal`.
#[derive(Debug, Default)]
pub struct CustomEventSource {
    names: HashSet<String>,
}

impl CustomEventSource {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl SignalSource for CustomEventSource {
    fn name(&self) -> &str {
        "custom_event"
    }

    fn on_event(&mut self, event: &HostEvent, ctx: &SignalContext<'_>) -> Result<(), SignalError> {
        if let HostEvent::Custom { name } = event {
            if self.names.contains(name) {
                ctx.triggers.fire(TriggerSource::CustomEvent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_browser::{Document, NodeSpec};
    use pagewatch_core::TriggerBus;

    fn fired(source: &mut dyn SignalSource, events: &[HostEvent]) -> Vec<TriggerSource> {
        let mut bus = TriggerBus::new();
        let mut rx = bus.take_rx().unwrap();
        let doc = Document::new("https://a.test/", NodeSpec::element(1, "body")).unwrap();
        let tx = bus.sender();
        let ctx = SignalContext {
            document: &doc,
            triggers: &tx,
        };
        for event in events {
            source.on_event(event, &ctx).unwrap();
        }
        std::iter::from_fn(|| rx.try_recv().ok().map(|t| t.source)).collect()
    }

    #[test]
    fn navigation_ignores_push_state() {
        let events = [
            HostEvent::PopState { url: "https://a.test/a".into() },
            HostEvent::LocationChanged { url: "https://a.test/b".into() },
            HostEvent::HashChange { url: "https://a.test/b#c".into() },
        ];
        assert_eq!(
            fired(&mut NavigationSource, &events),
            vec![TriggerSource::PopState, TriggerSource::HashChange]
        );
    }

    #[test]
    fn focus_fires_on_visible_only() {
        let events = [
            HostEvent::VisibilityChange { state: Visibility::Hidden },
            HostEvent::VisibilityChange { state: Visibility::Visible },
            HostEvent::Focus,
        ];
        assert_eq!(
            fired(&mut FocusSource, &events),
            vec![TriggerSource::DocumentVisible, TriggerSource::WindowFocus]
        );
    }

    #[test]
    fn custom_events_filtered_by_name() {
        let mut source = CustomEventSource::new(["shown.bs.modal"]);
        let events = [
            HostEvent::Custom { name: "hidden.bs.modal".into() },
            HostEvent::Custom { name: "shown.bs.modal".into() },
        ];
        assert_eq!(fired(&mut source, &events), vec![TriggerSource::CustomEvent]);
    }
}
