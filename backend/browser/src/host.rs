//! Host event vocabulary.
//!
//! The host adapter (a browser shim, a recorder, or a test) reports everything
//! that happens on the page as [`HostEvent`]s. Mutation batches arrive exactly
//! as a browser would deliver them to one observer callback.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dom::{NodeId, NodeSpec};

/// One structural or content change, applied in order within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationRecord {
    ChildList {
        target: NodeId,
        #[serde(default)]
        added: Vec<NodeSpec>,
        #[serde(default)]
        removed: Vec<NodeId>,
        /// Insert added nodes before this sibling; append when absent.
        #[serde(default)]
        before: Option<NodeId>,
    },
    CharacterData {
        target: NodeId,
        text: String,
    },
    Attributes {
        target: NodeId,
        name: String,
        value: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    ChildList,
    CharacterData,
    Attributes,
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::ChildList { target, .. }
            | MutationRecord::CharacterData { target, .. }
            | MutationRecord::Attributes { target, .. } => *target,
        }
    }

    pub fn kind(&self) -> MutationKind {
        match self {
            MutationRecord::ChildList { .. } => MutationKind::ChildList,
            MutationRecord::CharacterData { .. } => MutationKind::CharacterData,
            MutationRecord::Attributes { .. } => MutationKind::Attributes,
        }
    }

    /// Nodes added by this record (empty for non child-list records).
    pub fn added(&self) -> &[NodeSpec] {
        match self {
            MutationRecord::ChildList { added, .. } => added,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Everything the host reports about the page after it has loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// One observer delivery worth of DOM mutations.
    Mutations { records: Vec<MutationRecord> },
    /// Back/forward navigation landed on `url`.
    PopState { url: String },
    /// The fragment changed; `url` is the new location.
    HashChange { url: String },
    /// `history.pushState`/`replaceState`: the URL changed without any event.
    LocationChanged { url: String },
    /// The window regained focus.
    Focus,
    VisibilityChange { state: Visibility },
    /// A click, as seen by a capturing listener at the document root.
    Click { target: NodeId },
    /// A named host-specific event (e.g. `shown.bs.modal`).
    Custom { name: String },
    /// A global function became available on the host page.
    DefineGlobal { name: String },
    /// The host page called a global function.
    CallGlobal {
        name: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl HostEvent {
    pub fn kind_name(&self) -> &'static str {
        match self {
            HostEvent::Mutations { .. } => "mutations",
            HostEvent::PopState { .. } => "pop_state",
            HostEvent::HashChange { .. } => "hash_change",
            HostEvent::LocationChanged { .. } => "location_changed",
            HostEvent::Focus => "focus",
            HostEvent::VisibilityChange { .. } => "visibility_change",
            HostEvent::Click { .. } => "click",
            HostEvent::Custom { .. } => "custom",
            HostEvent::DefineGlobal { .. } => "define_global",
            HostEvent::CallGlobal { .. } => "call_global",
        }
    }
}

/// The initial page state, captured when tracking starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLoad {
    pub url: String,
    pub document: NodeSpec,
}
