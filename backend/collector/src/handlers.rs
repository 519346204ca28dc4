//! Route handlers for the collector API.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use pagewatch_config::CollectorConfig;
use pagewatch_logging::{TelemetryEvent, TelemetryLogger};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::sanitize::PageViewRow;
use crate::store::DailyCsvLog;

pub const MSG_TRACKED: &str = "Page view tracked successfully.";
pub const MSG_MISSING_FIELDS: &str = "Missing pageUrl or clickTime in request.";
pub const MSG_SAVE_FAILED: &str = "Error saving data on server.";

/// Shared across all routes.
#[derive(Clone)]
pub struct CollectorState {
    pub log: Arc<DailyCsvLog>,
    pub field_limit: usize,
    pub session_id: String,
    pub started_at: Instant,
}

impl CollectorState {
    pub fn new(log: DailyCsvLog, field_limit: usize) -> Self {
        Self {
            log: Arc::new(log),
            field_limit,
            session_id: uuid::Uuid::new_v4().to_string(),
            started_at: Instant::now(),
        }
    }

    pub fn from_config(config: &CollectorConfig) -> Self {
        Self::new(DailyCsvLog::new(config.log_dir()), config.field_limit())
    }
}

/// Body of `POST /api/track-page-view`. Fields stay loosely typed: clients
/// may post objects where text is expected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    #[serde(default)]
    pub page_url: Option<Value>,
    #[serde(default)]
    pub click_time: Option<Value>,
    #[serde(default)]
    pub page_title: Option<Value>,
    #[serde(default)]
    pub h1_text: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    fn reply(status: StatusCode, message: &str) -> (StatusCode, Json<MessageBody>) {
        (
            status,
            Json(MessageBody {
                message: message.to_string(),
            }),
        )
    }
}

/// Falsy values (`null`, `false`, `0`, `""`) count as missing.
fn required(value: &Option<Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::Number(n)) if n.as_f64().is_none_or(|f| f == 0.0 || f.is_nan()) => None,
        Some(v) => Some(v),
    }
}

#[instrument(skip_all)]
pub async fn track_page_view(
    State(state): State<CollectorState>,
    body: Result<Json<TrackRequest>, JsonRejection>,
) -> (StatusCode, Json<MessageBody>) {
    // a body that is not a JSON object carries no fields at all
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "Unreadable page view body");
            TrackRequest::default()
        }
    };
    let (Some(page_url), Some(click_time)) =
        (required(&request.page_url), required(&request.click_time))
    else {
        debug!("Rejecting page view without pageUrl or clickTime");
        return MessageBody::reply(StatusCode::BAD_REQUEST, MSG_MISSING_FIELDS);
    };

    let row = PageViewRow::from_values(
        click_time,
        page_url,
        request.h1_text.as_ref(),
        request.page_title.as_ref(),
        state.field_limit,
    );

    match state.log.append(&row).await {
        Ok(path) => {
            TelemetryLogger::log_event(
                &state.session_id,
                TelemetryEvent::RowAppended {
                    file: path.display().to_string(),
                    page_url: row.page_url.clone(),
                },
            );
            MessageBody::reply(StatusCode::OK, MSG_TRACKED)
        }
        Err(e) => {
            error!(error = %e, "Failed to append page view");
            MessageBody::reply(StatusCode::INTERNAL_SERVER_ERROR, MSG_SAVE_FAILED)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub log_dir: String,
}

pub async fn health(State(state): State<CollectorState>) -> Json<HealthReport> {
    let log_dir = state.log.dir();
    if !log_dir.exists() {
        warn!(dir = %log_dir.display(), "Log directory missing");
    }
    Json(HealthReport {
        status: "ok".into(),
        service: env!("CARGO_PKG_NAME").into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        log_dir: log_dir.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CSV_HEADER;
    use serde_json::json;

    fn state(dir: &std::path::Path, limit: usize) -> CollectorState {
        CollectorState::new(DailyCsvLog::new(dir), limit)
    }

    fn request(body: Value) -> Result<Json<TrackRequest>, JsonRejection> {
        Ok(Json(serde_json::from_value(body).unwrap()))
    }

    async fn today_log(state: &CollectorState) -> String {
        let path = state.log.path_for(DailyCsvLog::today());
        tokio::fs::read_to_string(path).await.unwrap()
    }

    #[tokio::test]
    async fn tracks_a_page_view() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), 500);
        let (status, Json(body)) = track_page_view(
            State(st.clone()),
            request(json!({
                "pageUrl": "https://a.test/",
                "pageTitle": "Home",
                "h1Text": "",
                "clickTime": "2026-03-01T12:00:00.000Z"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.message, MSG_TRACKED);
        let content = today_log(&st).await;
        assert_eq!(
            content,
            format!("{CSV_HEADER}\"2026-03-01T12:00:00.000Z\",\"https://a.test/\",\"\",\"Home\"\n")
        );
    }

    #[tokio::test]
    async fn missing_required_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), 500);

        for body in [
            json!({"pageTitle": "x", "clickTime": "t"}),
            json!({"pageUrl": "", "clickTime": "t"}),
            json!({"pageUrl": "https://a.test/", "clickTime": null}),
            json!({"pageUrl": 0, "clickTime": false}),
            json!({"pageUrl": "https://a.test/", "clickTime": 0.0}),
        ] {
            let (status, Json(reply)) = track_page_view(State(st.clone()), request(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(reply.message, MSG_MISSING_FIELDS);
        }
        assert!(!st.log.path_for(DailyCsvLog::today()).exists());
    }

    #[tokio::test]
    async fn object_fields_are_coerced_and_capped() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), 5);
        let (status, _) = track_page_view(
            State(st.clone()),
            request(json!({
                "pageUrl": "https://a.test/long",
                "clickTime": "t",
                "h1Text": {"textContent": "Quarterly report"},
                "pageTitle": {}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let content = today_log(&st).await;
        assert!(content.ends_with("\"t\",\"https...\",\"Quart...\",\"\"\n"));
    }

    #[tokio::test]
    async fn write_failure_is_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        tokio::fs::write(&blocker, "x").await.unwrap();
        let st = state(&blocker, 500);
        let (status, Json(reply)) = track_page_view(
            State(st),
            request(json!({"pageUrl": "https://a.test/", "clickTime": "t"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply.message, MSG_SAVE_FAILED);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let Json(report) = health(State(state(dir.path(), 500))).await;
        assert_eq!(report.status, "ok");
        assert_eq!(report.service, "pagewatch-collector");
    }
}
