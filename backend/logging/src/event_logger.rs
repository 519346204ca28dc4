//! Telemetry Event Logger
//!
//! Structured pipeline events (report sent/failed/suppressed, intercept
//! resolution, collector appends) written through `tracing` on a dedicated
//! target so they land in the NDJSON log as one entry each.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

/// `tracing` target for telemetry events.
pub const EVENT_TARGET: &str = "pagewatch_events";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    ReportSent {
        page_url: String,
        page_title: String,
        h1_text: String,
        trigger: String,
    },
    ReportFailed {
        page_url: String,
        error: String,
    },
    ReportSuppressed {
        page_url: String,
        trigger: String,
    },
    InterceptResolved {
        function: String,
        wrapped: bool,
        attempts: u32,
    },
    RowAppended {
        file: String,
        page_url: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct TelemetryLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: TelemetryEvent,
}

pub struct TelemetryLogger;

impl TelemetryLogger {
    /// Redacts the event's free-text fields and emits it on [`EVENT_TARGET`].
    pub fn log_event(session_id: &str, mut event: TelemetryEvent) -> TelemetryLogEntry {
        match &mut event {
            TelemetryEvent::ReportSent { page_url, .. }
            | TelemetryEvent::ReportSuppressed { page_url, .. }
            | TelemetryEvent::RowAppended { page_url, .. } => {
                *page_url = redact_sensitive_data(page_url);
            }
            TelemetryEvent::ReportFailed { page_url, error } => {
                *page_url = redact_sensitive_data(page_url);
                *error = redact_sensitive_data(error);
            }
            TelemetryEvent::InterceptResolved { .. } => {}
        }

        let entry = TelemetryLogEntry {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event,
        };

        let json = serde_json::to_string(&entry).unwrap_or_else(|_| format!("{entry:?}"));
        info!(target: EVENT_TARGET, event = %json, "Telemetry event");
        entry
    }
}
