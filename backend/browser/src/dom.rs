//! Headless document model.
//!
//! Nodes live in an arena keyed by host-assigned [`NodeId`]s so that mutation
//! records, click targets, and scoped observers can refer to them stably.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::DomError;
use crate::host::MutationRecord;
use crate::selector::SelectorList;

/// Host-assigned node identity, stable for the node's lifetime.
pub type NodeId = u64;

/// Serialized form of a DOM subtree as sent by the host adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSpec {
    Element {
        id: NodeId,
        tag: String,
        #[serde(default)]
        attrs: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<NodeSpec>,
    },
    Text {
        id: NodeId,
        text: String,
    },
}

impl NodeSpec {
    pub fn element(id: NodeId, tag: impl Into<String>) -> Self {
        NodeSpec::Element {
            id,
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(id: NodeId, text: impl Into<String>) -> Self {
        NodeSpec::Text {
            id,
            text: text.into(),
        }
    }

    /// Builder: set an attribute. No-op on text nodes.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let NodeSpec::Element { attrs, .. } = &mut self {
            attrs.insert(name.into(), value.into());
        }
        self
    }

    /// Builder: append a child. No-op on text nodes.
    pub fn child(mut self, child: NodeSpec) -> Self {
        if let NodeSpec::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn id(&self) -> NodeId {
        match self {
            NodeSpec::Element { id, .. } | NodeSpec::Text { id, .. } => *id,
        }
    }
}

/// Tag and attributes of an element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    tag: String,
    attrs: BTreeMap<String, String>,
}

impl ElementData {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Element's own computed visibility, approximated from the inline style and
    /// the `hidden` attribute.
    fn is_rendered(&self) -> bool {
        if self.attrs.contains_key("hidden") {
            return false;
        }
        let Some(style) = self.attr("style") else {
            return true;
        };
        !style.split(';').any(|decl| {
            let Some((prop, value)) = decl.split_once(':') else {
                return false;
            };
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim().trim_end_matches("!important").trim().to_ascii_lowercase();
            (prop == "display" && value == "none") || (prop == "visibility" && value == "hidden")
        })
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// The live page document.
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
}

impl Document {
    pub fn new(url: impl Into<String>, root: NodeSpec) -> Result<Self, DomError> {
        if !matches!(root, NodeSpec::Element { .. }) {
            return Err(DomError::RootNotElement);
        }
        let mut doc = Self {
            url: url.into(),
            root: root.id(),
            nodes: HashMap::new(),
        };
        doc.insert(None, root, None)?;
        Ok(doc)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(&id)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id)?.parent
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_element(*p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// Whether `node` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return self.exists(id);
            }
            current = self.parent(id);
        }
        false
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Concatenated text of every text node under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, None, &mut out);
        out
    }

    /// Like [`text_content`](Self::text_content), skipping descendant elements
    /// that match `strip` (e.g. close buttons inside a heading).
    pub fn text_content_without(&self, id: NodeId, strip: &SelectorList) -> String {
        let mut out = String::new();
        self.collect_text(id, Some(strip), &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, strip: Option<&SelectorList>, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(_) => {
                for child in &node.children {
                    if strip.is_some_and(|s| s.matches(self, *child)) {
                        continue;
                    }
                    self.collect_text(*child, strip, out);
                }
            }
        }
    }

    /// First element in document order (root included) matching `selector`.
    pub fn query_selector(&self, selector: &SelectorList) -> Option<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .find(|id| selector.matches(self, *id))
    }

    pub fn query_selector_all(&self, selector: &SelectorList) -> Vec<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .filter(|id| selector.matches(self, *id))
            .collect()
    }

    /// First descendant of `scope` matching `selector`. Ancestors outside the
    /// scope still count toward combinators, as in the browser.
    pub fn query_selector_within(&self, scope: NodeId, selector: &SelectorList) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|id| selector.matches(self, *id))
    }

    /// Nearest inclusive ancestor element matching `selector`. Text nodes start
    /// from their parent element.
    pub fn closest(&self, id: NodeId, selector: &SelectorList) -> Option<NodeId> {
        let mut current = if self.is_element(id) {
            Some(id)
        } else {
            self.parent_element(id)
        };
        while let Some(candidate) = current {
            if selector.matches(self, candidate) {
                return Some(candidate);
            }
            current = self.parent_element(candidate);
        }
        None
    }

    pub fn is_rendered(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(ElementData::is_rendered)
    }

    pub fn body(&self) -> Option<NodeId> {
        self.first_by_tag("body")
    }

    pub fn title_element(&self) -> Option<NodeId> {
        self.first_by_tag("title")
    }

    /// `document.title`: the first title element's text, whitespace collapsed.
    pub fn title(&self) -> String {
        self.title_element()
            .map(|id| {
                self.text_content(id)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }

    fn first_by_tag(&self, tag: &str) -> Option<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .find(|id| self.element(*id).is_some_and(|el| el.tag == tag))
    }

    /// Apply one mutation record reported by the host.
    pub fn apply(&mut self, record: &MutationRecord) -> Result<(), DomError> {
        match record {
            MutationRecord::ChildList {
                target,
                added,
                removed,
                before,
            } => {
                if !self.is_element(*target) {
                    return Err(DomError::NotAnElement(*target));
                }
                for id in removed {
                    self.remove(*target, *id)?;
                }
                for spec in added {
                    self.insert(Some(*target), spec.clone(), *before)?;
                }
                Ok(())
            }
            MutationRecord::CharacterData { target, text } => {
                let node = self
                    .nodes
                    .get_mut(target)
                    .ok_or(DomError::UnknownNode(*target))?;
                match &mut node.data {
                    NodeData::Text(current) => {
                        *current = text.clone();
                        Ok(())
                    }
                    NodeData::Element(_) => Err(DomError::NotText(*target)),
                }
            }
            MutationRecord::Attributes {
                target,
                name,
                value,
            } => {
                let node = self
                    .nodes
                    .get_mut(target)
                    .ok_or(DomError::UnknownNode(*target))?;
                let NodeData::Element(el) = &mut node.data else {
                    return Err(DomError::NotAnElement(*target));
                };
                let name = name.to_ascii_lowercase();
                match value {
                    Some(v) => el.attrs.insert(name, v.clone()),
                    None => el.attrs.remove(&name),
                };
                Ok(())
            }
        }
    }

    fn insert(
        &mut self,
        parent: Option<NodeId>,
        spec: NodeSpec,
        before: Option<NodeId>,
    ) -> Result<(), DomError> {
        let id = spec.id();
        if self.nodes.contains_key(&id) {
            return Err(DomError::DuplicateNode(id));
        }

        let (data, children) = match spec {
            NodeSpec::Element {
                tag,
                attrs,
                children,
                ..
            } => {
                let attrs = attrs
                    .into_iter()
                    .map(|(k, v)| (k.to_ascii_lowercase(), v))
                    .collect();
                let el = ElementData {
                    tag: tag.to_ascii_lowercase(),
                    attrs,
                };
                (NodeData::Element(el), children)
            }
            NodeSpec::Text { text, .. } => (NodeData::Text(text), Vec::new()),
        };

        self.nodes.insert(
            id,
            Node {
                parent,
                children: Vec::new(),
                data,
            },
        );

        if let Some(parent_id) = parent {
            let siblings = &mut self
                .nodes
                .get_mut(&parent_id)
                .ok_or(DomError::UnknownNode(parent_id))?
                .children;
            match before.and_then(|b| siblings.iter().position(|c| *c == b)) {
                Some(index) => siblings.insert(index, id),
                None => siblings.push(id),
            }
        }

        for child in children {
            self.insert(Some(id), child, None)?;
        }
        Ok(())
    }

    fn remove(&mut self, parent: NodeId, id: NodeId) -> Result<(), DomError> {
        if self.parent(id) != Some(parent) {
            return Err(DomError::UnknownNode(id));
        }
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != id);
        }
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node in doomed {
            self.nodes.remove(&node);
        }
        Ok(())
    }
}
