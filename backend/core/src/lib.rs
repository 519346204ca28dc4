pub mod channel;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use channel::{TriggerBus, TriggerReceiver, TriggerSender, WeakTriggerSender};
pub use error::PageWatchError;
pub use event::{Trigger, TriggerSource};
pub use traits::{PageExtractor, ReportTransport};
pub use types::{LastSent, PageSnapshot, PageViewReport};
