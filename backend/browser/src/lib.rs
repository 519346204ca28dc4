//! Headless page model for the PageWatch client engine.
//!
//! The host adapter feeds [`HostEvent`]s into a [`Page`]; detection sources and
//! snapshot extraction read it through the [`Document`] API and CSS selectors.

pub mod dom;
pub mod endpoint;
pub mod error;
pub mod globals;
pub mod host;
pub mod overlay;
pub mod page;
pub mod selector;

pub use dom::{Document, ElementData, NodeId, NodeSpec};
pub use endpoint::{resolve_endpoint, DEFAULT_ENDPOINT};
pub use error::{DomError, PageError, ScriptError, SelectorError};
pub use globals::{GlobalScope, HostFunction};
pub use host::{HostEvent, MutationKind, MutationRecord, PageLoad, Visibility};
pub use overlay::{AnchoredHeading, GenericModal, OverlayFields, OverlayStrategy};
pub use page::{Page, SharedPage};
pub use selector::SelectorList;
