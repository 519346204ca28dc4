//! Page Control
//!
//! The page as the client engine sees it: the live document plus the host's
//! global functions, updated by applying host events in arrival order.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::dom::Document;
use crate::error::{DomError, PageError};
use crate::globals::GlobalScope;
use crate::host::{HostEvent, PageLoad};

pub type SharedPage = Arc<RwLock<Page>>;

#[derive(Debug, Clone)]
pub struct Page {
    document: Document,
    globals: GlobalScope,
}

impl Page {
    pub fn new(load: PageLoad) -> Result<Self, DomError> {
        Ok(Self {
            document: Document::new(load.url, load.document)?,
            globals: GlobalScope::new(),
        })
    }

    pub fn from_document(document: Document) -> Self {
        Self {
            document,
            globals: GlobalScope::new(),
        }
    }

    pub fn shared(self) -> SharedPage {
        Arc::new(RwLock::new(self))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn globals(&self) -> &GlobalScope {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut GlobalScope {
        &mut self.globals
    }

    /// Apply the page-side effects of a host event.
    ///
    /// Every record of a mutation batch is attempted; the first failure is
    /// returned. A `call_global` error is the host function's own exception.
    pub fn apply(&mut self, event: &HostEvent) -> Result<(), PageError> {
        match event {
            HostEvent::Mutations { records } => {
                let mut first_error = None;
                for record in records {
                    if let Err(e) = self.document.apply(record) {
                        debug!(error = %e, "Skipping mutation record");
                        first_error.get_or_insert(e);
                    }
                }
                match first_error {
                    Some(e) => Err(e.into()),
                    None => Ok(()),
                }
            }
            HostEvent::PopState { url }
            | HostEvent::HashChange { url }
            | HostEvent::LocationChanged { url } => {
                self.document.set_url(url.clone());
                Ok(())
            }
            HostEvent::DefineGlobal { name } => {
                self.globals.define_stub(name);
                Ok(())
            }
            HostEvent::CallGlobal { name, args } => {
                self.globals.call(name, args)?;
                Ok(())
            }
            HostEvent::Focus
            | HostEvent::VisibilityChange { .. }
            | HostEvent::Click { .. }
            | HostEvent::Custom { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeSpec;
    use crate::host::MutationRecord;

    fn load() -> PageLoad {
        PageLoad {
            url: "https://a.test/".into(),
            document: NodeSpec::element(1, "html").child(NodeSpec::element(2, "body")),
        }
    }

    #[test]
    fn navigation_events_update_url() {
        let mut page = Page::new(load()).unwrap();
        page.apply(&HostEvent::HashChange {
            url: "https://a.test/#doc-1".into(),
        })
        .unwrap();
        assert_eq!(page.document().url(), "https://a.test/#doc-1");

        page.apply(&HostEvent::LocationChanged {
            url: "https://a.test/search".into(),
        })
        .unwrap();
        assert_eq!(page.document().url(), "https://a.test/search");
    }

    #[test]
    fn bad_record_does_not_block_the_rest_of_the_batch() {
        let mut page = Page::new(load()).unwrap();
        let err = page
            .apply(&HostEvent::Mutations {
                records: vec![
                    MutationRecord::CharacterData {
                        target: 99,
                        text: "x".into(),
                    },
                    MutationRecord::ChildList {
                        target: 2,
                        added: vec![NodeSpec::element(3, "div")],
                        removed: vec![],
                        before: None,
                    },
                ],
            })
            .unwrap_err();
        assert_eq!(err, PageError::Dom(DomError::UnknownNode(99)));
        assert!(page.document().exists(3));
    }

    #[test]
    fn calling_undefined_global_surfaces_script_error() {
        let mut page = Page::new(load()).unwrap();
        let call = HostEvent::CallGlobal {
            name: "rpDocumentPropertiesPopup".into(),
            args: vec![],
        };
        assert!(matches!(page.apply(&call), Err(PageError::Script(_))));

        page.apply(&HostEvent::DefineGlobal {
            name: "rpDocumentPropertiesPopup".into(),
        })
        .unwrap();
        assert!(page.apply(&call).is_ok());
    }
}
