use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An abstract "recheck now" signal. Carries no page state: the receiver always
/// looks at the live page again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub source: TriggerSource,
    pub timestamp: DateTime<Utc>,
}

/// Which detection vantage point produced a trigger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// Published once when tracking starts
    Initial,
    /// Nodes added or removed somewhere under the body
    BodyMutation,
    /// The title element's content changed
    TitleMutation,
    /// A modal/dialog-like element was inserted
    OverlayInserted,
    /// Content changed inside the deep-watched overlay
    OverlayContent,
    /// Back/forward navigation
    PopState,
    /// The URL fragment changed
    HashChange,
    /// The window regained focus
    WindowFocus,
    /// The document became visible again
    DocumentVisible,
    /// A click landed on a known overlay-opening element
    TriggerClick,
    /// A configured host-specific event fired
    CustomEvent,
    /// A wrapped legacy global function was called
    InterceptedCall,
    /// The active-overlay text changed between two polls
    FallbackPoll,
}

impl Trigger {
    pub fn new(source: TriggerSource) -> Self {
        Self {
            source,
            timestamp: Utc::now(),
        }
    }
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}
