//! PageWatch collector.
//!
//! Receives page-view reports over HTTP and appends them to one CSV file per
//! day.

pub mod handlers;
pub mod sanitize;
pub mod server;
pub mod store;

pub use handlers::{CollectorState, HealthReport, MessageBody, TrackRequest};
pub use sanitize::{csv_escape, truncate, value_to_text, PageViewRow};
pub use server::{build_router, start_server};
pub use store::{DailyCsvLog, StoreError, CSV_HEADER};
