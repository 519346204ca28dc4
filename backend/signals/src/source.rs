//! Detection source trait.
//!
//! A source is one vantage point on the page. It is attached once against the
//! loaded document and then sees every host event after the page has applied
//! it, publishing recheck triggers through the shared bus.

use pagewatch_browser::{Document, HostEvent, SelectorError};
use pagewatch_core::{PageWatchError, TriggerSender};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("invalid selector: {0}")]
    Selector(#[from] SelectorError),

    #[error("nothing to observe: no {0} element")]
    MissingElement(&'static str),

    #[error(transparent)]
    Trigger(#[from] PageWatchError),
}

/// What a source may look at while handling one event.
pub struct SignalContext<'a> {
    /// The document, already updated by the event.
    pub document: &'a Document,
    pub triggers: &'a TriggerSender,
}

pub trait SignalSource: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Bind to the loaded document. A failure drops this source only.
    fn attach(&mut self, _document: &Document) -> Result<(), SignalError> {
        Ok(())
    }

    /// Inspect one host event and fire if it may have changed the page.
    fn on_event(&mut self, event: &HostEvent, ctx: &SignalContext<'_>) -> Result<(), SignalError>;
}
