//! Fallback poll of the active overlay.
//!
//! Lowest-priority safety net: every interval, read the text of the element
//! matching the active-overlay selector and fire when it differs from the
//! previous tick. The first tick only records a baseline.

use std::time::Duration;

use pagewatch_browser::{Document, SelectorList, SharedPage};
use pagewatch_core::{TriggerSource, WeakTriggerSender};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use crate::source::SignalError;

pub struct FallbackPoller {
    page: SharedPage,
    triggers: WeakTriggerSender,
    selector: SelectorList,
    interval: Duration,
    last: Option<String>,
}

impl FallbackPoller {
    pub fn new(
        page: SharedPage,
        triggers: WeakTriggerSender,
        selector: &str,
        interval: Duration,
    ) -> Result<Self, SignalError> {
        Ok(Self {
            page,
            triggers,
            selector: selector.parse()?,
            interval,
            last: None,
        })
    }

    /// Take one reading; true when it differs from the previous one. A missing
    /// overlay reads as empty text.
    pub fn sample(&mut self, doc: &Document) -> bool {
        let text = doc
            .query_selector(&self.selector)
            .map(|id| doc.text_content(id).trim().to_string())
            .unwrap_or_default();
        match self.last.replace(text) {
            None => false,
            Some(previous) => self.last.as_deref() != Some(previous.as_str()),
        }
    }

    /// Run until the trigger bus closes.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(sender) = self.triggers.upgrade() else {
                    break;
                };
                let shared = self.page.clone();
                let changed = {
                    let page = shared.read().await;
                    self.sample(page.document())
                };
                if changed && sender.fire(TriggerSource::FallbackPoll).is_err() {
                    break;
                }
            }
            debug!("Fallback poll stopped");
        })
    }
}
