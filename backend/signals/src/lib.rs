//! Signal Aggregator for PageWatch.
//!
//! Every detection vantage point (structural and title mutation, overlay
//! insertion, navigation, focus/visibility, trigger clicks, named host events,
//! wrapped legacy globals, and the fallback poll) funnels into one abstract
//! "recheck now" trigger on the [`pagewatch_core::TriggerBus`].

pub mod aggregator;
pub mod click;
pub mod events;
pub mod intercept;
pub mod mutation;
pub mod overlay;
pub mod poll;
pub mod source;

pub use aggregator::{Installation, SignalAggregator};
pub use click::TriggerClickSource;
pub use events::{CustomEventSource, FocusSource, NavigationSource};
pub use intercept::{DiscoveryPolicy, InterceptStatus, InterceptionRegistry};
pub use mutation::{BodyMutationSource, TitleMutationSource};
pub use overlay::OverlayInsertionSource;
pub use poll::FallbackPoller;
pub use source::{SignalContext, SignalError, SignalSource};
