use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// The reportable identity of the current page or overlay state.
///
/// Snapshots are derived fresh on every extraction and replaced wholesale,
/// never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub heading_text: String,
}

impl PageSnapshot {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        heading_text: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            heading_text: heading_text.into(),
        }
    }
}

impl fmt::Display for PageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?} / {:?})", self.url, self.title, self.heading_text)
    }
}

/// The snapshot of the most recent *successful* transmission.
///
/// Starts out `Unset`, which differs from every real snapshot, so the very
/// first extraction is always eligible to send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LastSent {
    #[default]
    Unset,
    Sent(PageSnapshot),
}

impl LastSent {
    /// Exact field-for-field comparison; any differing field makes the snapshot eligible.
    pub fn differs_from(&self, snapshot: &PageSnapshot) -> bool {
        match self {
            LastSent::Unset => true,
            LastSent::Sent(previous) => previous != snapshot,
        }
    }

    /// Record a confirmed transmission. A single assignment, so no compare can observe it half-done.
    pub fn record(&mut self, snapshot: PageSnapshot) {
        *self = LastSent::Sent(snapshot);
    }

    pub fn snapshot(&self) -> Option<&PageSnapshot> {
        match self {
            LastSent::Unset => None,
            LastSent::Sent(snapshot) => Some(snapshot),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, LastSent::Unset)
    }
}

/// Wire body posted to the collector: `{ pageUrl, clickTime, pageTitle, h1Text }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewReport {
    pub page_url: String,
    pub click_time: String,
    pub page_title: String,
    pub h1_text: String,
}

impl PageViewReport {
    /// Build a report for `snapshot`, stamped with `at` as an ISO-8601 UTC string
    /// with millisecond precision.
    pub fn from_snapshot(snapshot: &PageSnapshot, at: DateTime<Utc>) -> Self {
        Self {
            page_url: snapshot.url.clone(),
            click_time: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            page_title: snapshot.title.clone(),
            h1_text: snapshot.heading_text.clone(),
        }
    }

    /// The snapshot fields this report carries.
    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot::new(&self.page_url, &self.page_title, &self.h1_text)
    }
}
