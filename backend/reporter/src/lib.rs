//! Coalescing Reporter for PageWatch.
//!
//! Consumes the trigger bus, debounces bursts into a single
//! extraction-compare-send cycle, and remembers the last successful report.

pub mod extract;
pub mod reporter;
pub mod transport;

pub use extract::{build_strategies, snapshot_of, LivePageExtractor};
pub use reporter::{CoalescingReporter, PendingSend, ReportOutcome};
pub use transport::HttpTransport;
