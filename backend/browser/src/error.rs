use thiserror::Error;

use crate::dom::NodeId;

/// Selector text that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected {found:?} at position {position} in selector {selector:?}")]
    Unexpected {
        found: char,
        position: usize,
        selector: String,
    },

    #[error("unterminated attribute selector in {0:?}")]
    UnterminatedAttribute(String),

    #[error("unsupported selector syntax in {0:?}")]
    Unsupported(String),
}

/// A host mutation that does not fit the current document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0} is not a text node")]
    NotText(NodeId),

    #[error("document root must be an element")]
    RootNotElement,
}

/// An error thrown by a host page function.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{function} threw: {message}")]
pub struct ScriptError {
    pub function: String,
    pub message: String,
}

impl ScriptError {
    pub fn new(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// Failure applying a host event to the page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Script(#[from] ScriptError),
}
