//! Overlay detection strategies.
//!
//! Deployments disagree on what "the active overlay" looks like, so detection
//! is an ordered list of strategies; the first one that recognizes an overlay
//! supplies the snapshot fields.

use std::fmt;

use crate::dom::{Document, NodeId};
use crate::error::SelectorError;
use crate::selector::SelectorList;

/// Selector for controls stripped from overlay headings before reading their text.
pub const DEFAULT_STRIP_SELECTOR: &str = "button, .close";

/// Fields an overlay contributes. `None` keeps the plain-document value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayFields {
    pub heading: Option<String>,
    pub title: Option<String>,
}

pub trait OverlayStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// `Some` when this strategy recognizes a visible overlay. Claiming the page
    /// with empty fields still stops later strategies from being consulted.
    fn extract(&self, doc: &Document) -> Option<OverlayFields>;
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Site-specific layout: an AJAX content container whose parent also holds the
/// overlay heading. The heading doubles as the title.
#[derive(Debug, Clone)]
pub struct AnchoredHeading {
    container: SelectorList,
    heading: SelectorList,
    strip: SelectorList,
}

impl AnchoredHeading {
    pub fn new(container: &str, heading: &str, strip: &str) -> Result<Self, SelectorError> {
        Ok(Self {
            container: container.parse()?,
            heading: heading.parse()?,
            strip: strip.parse()?,
        })
    }
}

impl OverlayStrategy for AnchoredHeading {
    fn name(&self) -> &str {
        "anchored_heading"
    }

    fn extract(&self, doc: &Document) -> Option<OverlayFields> {
        let container = doc.query_selector(&self.container)?;
        if !doc.is_rendered(container) {
            return None;
        }
        let parent = doc.parent_element(container)?;
        let heading = doc.query_selector_within(parent, &self.heading)?;
        let text = non_empty(doc.text_content_without(heading, &self.strip));
        Some(OverlayFields {
            heading: text.clone(),
            title: text,
        })
    }
}

/// Generic modal/dialog markup (Bootstrap-style classes or ARIA role).
#[derive(Debug, Clone)]
pub struct GenericModal {
    visible: SelectorList,
    candidates: SelectorList,
    heading: SelectorList,
    title: SelectorList,
    strip: SelectorList,
}

impl GenericModal {
    pub fn new(
        visible: &str,
        candidates: &str,
        heading: &str,
        title: &str,
        strip: &str,
    ) -> Result<Self, SelectorError> {
        Ok(Self {
            visible: visible.parse()?,
            candidates: candidates.parse()?,
            heading: heading.parse()?,
            title: title.parse()?,
            strip: strip.parse()?,
        })
    }

    /// The modal currently on screen: an explicitly shown modal first, then the
    /// first rendered candidate.
    pub fn active(&self, doc: &Document) -> Option<NodeId> {
        if let Some(shown) = doc.query_selector(&self.visible) {
            if doc.is_rendered(shown) {
                return Some(shown);
            }
        }
        doc.query_selector_all(&self.candidates)
            .into_iter()
            .find(|id| doc.is_rendered(*id))
    }
}

impl Default for GenericModal {
    fn default() -> Self {
        Self {
            visible: SelectorList::parse(".modal.show, .modal.in").expect("valid selector"),
            candidates: SelectorList::parse(".modal, [role=\"dialog\"]").expect("valid selector"),
            heading: SelectorList::parse("h1").expect("valid selector"),
            title: SelectorList::parse(".modal-title").expect("valid selector"),
            strip: SelectorList::parse(DEFAULT_STRIP_SELECTOR).expect("valid selector"),
        }
    }
}

impl OverlayStrategy for GenericModal {
    fn name(&self) -> &str {
        "generic_modal"
    }

    fn extract(&self, doc: &Document) -> Option<OverlayFields> {
        let modal = self.active(doc)?;
        let heading = doc
            .query_selector_within(modal, &self.heading)
            .and_then(|h| non_empty(doc.text_content_without(h, &self.strip)));
        let title = doc
            .query_selector_within(modal, &self.title)
            .and_then(|t| non_empty(doc.text_content(t)));
        Some(OverlayFields {
            title: title.or_else(|| heading.clone()),
            heading,
        })
    }
}
