//! Structural and title mutation sources.

use pagewatch_browser::{Document, HostEvent, MutationRecord, NodeId};
use pagewatch_core::TriggerSource;

use crate::source::{SignalContext, SignalError, SignalSource};

/// Node additions and removals anywhere under the body. One batch fires once.
#[derive(Debug, Default)]
pub struct BodyMutationSource {
    scope: Option<NodeId>,
    character_data: bool,
}

impl BodyMutationSource {
    pub fn new(character_data: bool) -> Self {
        Self {
            scope: None,
            character_data,
        }
    }

    fn is_relevant(&self, doc: &Document, scope: NodeId, record: &MutationRecord) -> bool {
        if !doc.contains(scope, record.target()) {
            return false;
        }
        match record {
            MutationRecord::ChildList { added, removed, .. } => {
                !added.is_empty() || !removed.is_empty()
            }
            MutationRecord::CharacterData { .. } => self.character_data,
            MutationRecord::Attributes { .. } => false,
        }
    }
}

impl SignalSource for BodyMutationSource {
    fn name(&self) -> &str {
        "body_mutation"
    }

    fn attach(&mut self, document: &Document) -> Result<(), SignalError> {
        // pages without a body are observed from the root element
        self.scope = Some(document.body().unwrap_or_else(|| document.root()));
        Ok(())
    }

    fn on_event(&mut self, event: &HostEvent, ctx: &SignalContext<'_>) -> Result<(), SignalError> {
        let (HostEvent::Mutations { records }, Some(scope)) = (event, self.scope) else {
            return Ok(());
        };
        if records
            .iter()
            .any(|r| self.is_relevant(ctx.document, scope, r))
        {
            ctx.triggers.fire(TriggerSource::BodyMutation)?;
        }
        Ok(())
    }
}

/// Content changes of the `<title>` element.
#[derive(Debug, Default)]
pub struct TitleMutationSource {
    title: Option<NodeId>,
}

impl TitleMutationSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalSource for TitleMutationSource {
    fn name(&self) -> &str {
        "title_mutation"
    }

    fn attach(&mut self, document: &Document) -> Result<(), SignalError> {
        let title = document
            .title_element()
            .ok_or(SignalError::MissingElement("title"))?;
        self.title = Some(title);
        Ok(())
    }

    fn on_event(&mut self, event: &HostEvent, ctx: &SignalContext<'_>) -> Result<(), SignalError> {
        let (HostEvent::Mutations { records }, Some(title)) = (event, self.title) else {
            return Ok(());
        };
        if records
            .iter()
            .any(|r| ctx.document.contains(title, r.target()))
        {
            ctx.triggers.fire(TriggerSource::TitleMutation)?;
        }
        Ok(())
    }
}
