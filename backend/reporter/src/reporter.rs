//! Coalescing Reporter
//!
//! Single subscriber of the trigger bus. Every trigger cancels the pending send
//! and re-arms it one debounce window later; when the window closes the page is
//! extracted again and sent only if it differs from the last successful report.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pagewatch_core::{
    LastSent, PageExtractor, PageSnapshot, PageViewReport, ReportTransport, Trigger,
    TriggerReceiver, TriggerSource,
};
use pagewatch_logging::{TelemetryEvent, TelemetryLogger};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The one scheduled-but-not-yet-fired send.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub fire_at: Instant,
    /// The trigger that armed this deadline.
    pub armed_by: TriggerSource,
    /// What the page looked like when it was armed. Diagnostic only: the
    /// decision uses a fresh extraction at fire time.
    pub armed_with: Option<PageSnapshot>,
}

/// Result of one extraction-compare-send cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Sent(PageViewReport),
    /// Identical to the last successful report.
    Suppressed(PageSnapshot),
    Failed {
        snapshot: Option<PageSnapshot>,
        error: String,
    },
}

pub struct CoalescingReporter {
    extractor: Arc<dyn PageExtractor>,
    transport: Arc<dyn ReportTransport>,
    debounce: Duration,
    last_sent: LastSent,
    pending: Option<PendingSend>,
    outcomes: Option<mpsc::UnboundedSender<ReportOutcome>>,
    session_id: String,
}

impl CoalescingReporter {
    pub fn new(
        extractor: Arc<dyn PageExtractor>,
        transport: Arc<dyn ReportTransport>,
        debounce: Duration,
    ) -> Self {
        Self {
            extractor,
            transport,
            debounce,
            last_sent: LastSent::default(),
            pending: None,
            outcomes: None,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Also publish every [`ReportOutcome`] on `tx`.
    pub fn with_outcomes(mut self, tx: mpsc::UnboundedSender<ReportOutcome>) -> Self {
        self.outcomes = Some(tx);
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn last_sent(&self) -> &LastSent {
        &self.last_sent
    }

    pub fn pending(&self) -> Option<&PendingSend> {
        self.pending.as_ref()
    }

    /// Trigger entry point: cancel any pending send, re-extract, and arm a new
    /// deadline one debounce window from now.
    pub async fn on_trigger(&mut self, trigger: &Trigger) {
        if let Some(previous) = self.pending.take() {
            debug!(cancelled = %previous.armed_by, by = %trigger.source, "Pending send replaced");
        }

        let armed_with = match self.extractor.extract().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(trigger = %trigger.source, error = %e, "Extraction at trigger time failed");
                None
            }
        };

        self.pending = Some(PendingSend {
            fire_at: Instant::now() + self.debounce,
            armed_by: trigger.source,
            armed_with,
        });
    }

    /// Close the debounce window: clear the pending send, re-extract, compare,
    /// and transmit once if the page changed. Returns `None` when nothing was
    /// pending.
    pub async fn fire(&mut self) -> Option<ReportOutcome> {
        let pending = self.pending.take()?;
        let trigger = pending.armed_by.to_string();

        let snapshot = match self.extractor.extract().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(trigger = %trigger, error = %e, "Extraction failed; skipping report");
                return Some(self.publish(ReportOutcome::Failed {
                    snapshot: None,
                    error: e.to_string(),
                }));
            }
        };

        if !self.last_sent.differs_from(&snapshot) {
            debug!(trigger = %trigger, %snapshot, "Page unchanged since last report");
            TelemetryLogger::log_event(
                &self.session_id,
                TelemetryEvent::ReportSuppressed {
                    page_url: snapshot.url.clone(),
                    trigger,
                },
            );
            return Some(self.publish(ReportOutcome::Suppressed(snapshot)));
        }

        let report = PageViewReport::from_snapshot(&snapshot, Utc::now());
        match self.transport.send(&report).await {
            Ok(()) => {
                info!(transport = self.transport.name(), %snapshot, "Page view reported");
                self.last_sent.record(snapshot);
                TelemetryLogger::log_event(
                    &self.session_id,
                    TelemetryEvent::ReportSent {
                        page_url: report.page_url.clone(),
                        page_title: report.page_title.clone(),
                        h1_text: report.h1_text.clone(),
                        trigger,
                    },
                );
                Some(self.publish(ReportOutcome::Sent(report)))
            }
            Err(e) => {
                warn!(transport = self.transport.name(), error = %e, "Failed to send page view");
                TelemetryLogger::log_event(
                    &self.session_id,
                    TelemetryEvent::ReportFailed {
                        page_url: report.page_url.clone(),
                        error: e.to_string(),
                    },
                );
                Some(self.publish(ReportOutcome::Failed {
                    snapshot: Some(snapshot),
                    error: e.to_string(),
                }))
            }
        }
    }

    fn publish(&self, outcome: ReportOutcome) -> ReportOutcome {
        if let Some(tx) = &self.outcomes {
            let _ = tx.send(outcome.clone());
        }
        outcome
    }

    /// Consume triggers until every publisher is gone, then fire any send still
    /// pending at its deadline. Returns the reporter for inspection.
    pub async fn run(mut self, mut rx: TriggerReceiver) -> Self {
        info!(
            session_id = %self.session_id,
            debounce_ms = self.debounce.as_millis() as u64,
            transport = self.transport.name(),
            "Reporter started"
        );

        loop {
            let deadline = self.pending.as_ref().map(|p| p.fire_at);
            tokio::select! {
                biased;
                trigger = rx.recv() => match trigger {
                    Some(trigger) => self.on_trigger(&trigger).await,
                    None => break,
                },
                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.fire().await;
                }
            }
        }

        if let Some(fire_at) = self.pending.as_ref().map(|p| p.fire_at) {
            debug!("Trigger bus closed; draining pending send");
            time::sleep_until(fire_at).await;
            self.fire().await;
        }

        info!(
            session_id = %self.session_id,
            last_sent = %json!(self.last_sent.snapshot()),
            "Reporter stopped"
        );
        self
    }
}
