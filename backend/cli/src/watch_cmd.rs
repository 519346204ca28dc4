//! `pagewatch watch`: drive the client engine from a recorded session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use pagewatch_browser::{resolve_endpoint, Page, SelectorList, SharedPage};
use pagewatch_config::PageWatchConfig;
use pagewatch_core::{PageSnapshot, ReportTransport, TriggerBus};
use pagewatch_reporter::{CoalescingReporter, HttpTransport, LivePageExtractor, ReportOutcome};
use pagewatch_signals::SignalAggregator;
use serde::Serialize;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::replay::ReplayReader;

/// What a replay produced.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchSummary {
    pub events: usize,
    pub sent: usize,
    pub suppressed: usize,
    pub failed: usize,
    pub last_sent: Option<PageSnapshot>,
}

pub async fn run(config: PageWatchConfig, input: Option<PathBuf>, endpoint: Option<String>) -> Result<()> {
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match input {
        Some(path) if path.as_os_str() != "-" => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        _ => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut replay = ReplayReader::new(reader);

    let load = replay.read_load().await?;
    let page = Page::new(load).context("failed to build page from load line")?;

    let client = config.client();
    let configured = endpoint.or_else(|| client.endpoint.clone());
    let script = SelectorList::parse(client.script_selector())
        .context("invalid client.scriptSelector")?;
    let endpoint = resolve_endpoint(page.document(), &script, configured.as_deref());
    info!(endpoint = %endpoint, url = %page.document().url(), "Replaying recorded session");

    let transport = HttpTransport::new(endpoint)?;
    let summary = drive(&config, page.shared(), replay, Arc::new(transport)).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Feed every recorded event through the aggregator and let the reporter
/// settle once the recording ends.
pub async fn drive<R: AsyncBufRead + Unpin>(
    config: &PageWatchConfig,
    page: SharedPage,
    mut replay: ReplayReader<R>,
    transport: Arc<dyn ReportTransport>,
) -> Result<WatchSummary> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let mut bus = TriggerBus::new();
    let rx = bus.take_rx().context("trigger receiver already taken")?;

    let extractor = LivePageExtractor::from_config(page.clone(), &config.overlay());
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
    let reporter = CoalescingReporter::new(Arc::new(extractor), transport, config.client().debounce())
        .with_outcomes(outcome_tx)
        .with_session_id(session_id.clone());
    let reporter_task = tokio::spawn(reporter.run(rx));

    let mut aggregator = SignalAggregator::new(page, bus.sender()).with_session_id(session_id);
    let installation = aggregator.install(config).await;
    aggregator.start()?;

    let mut summary = WatchSummary::default();
    while let Some(line) = replay.next_event().await? {
        if line.delay_ms > 0 {
            tokio::time::sleep(line.delay()).await;
        }
        if let Err(e) = aggregator.dispatch(&line.event).await {
            warn!(event = line.event.kind_name(), error = %e, "Host event failed");
        }
        summary.events += 1;
    }

    info!(events = summary.events, "Recording finished, draining reporter");
    installation.shutdown().await;
    drop(aggregator);
    drop(bus);

    let reporter = reporter_task.await.context("reporter task failed")?;
    while let Ok(outcome) = outcome_rx.try_recv() {
        match outcome {
            ReportOutcome::Sent(_) => summary.sent += 1,
            ReportOutcome::Suppressed(_) => summary.suppressed += 1,
            ReportOutcome::Failed { .. } => summary.failed += 1,
        }
    }
    summary.last_sent = reporter.last_sent().snapshot().cloned();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pagewatch_core::{PageViewReport, PageWatchError};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<PageViewReport>>,
    }

    #[async_trait]
    impl ReportTransport for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn send(&self, report: &PageViewReport) -> Result<(), PageWatchError> {
            self.sent.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    const LOAD: &str = r#"{"type":"load","url":"https://a.test/","document":
{"kind":"element","id":1,"tag":"html","children":[
  {"kind":"element","id":2,"tag":"head","children":[
    {"kind":"element","id":3,"tag":"title","children":[{"kind":"text","id":4,"text":"Home"}]}]},
  {"kind":"element","id":5,"tag":"body","children":[
    {"kind":"element","id":6,"tag":"h1","children":[{"kind":"text","id":7,"text":"Welcome"}]}]}]}}"#;

    async fn replay(events: &[&str]) -> (WatchSummary, Vec<PageViewReport>) {
        let mut input = LOAD.replace('\n', "");
        input.push('\n');
        for event in events {
            input.push_str(event);
            input.push('\n');
        }

        let mut reader = ReplayReader::new(input.as_bytes());
        let load = reader.read_load().await.unwrap();
        let page = Page::new(load).unwrap().shared();
        let recorder = Arc::new(Recorder::default());

        let summary = drive(&PageWatchConfig::default(), page, reader, recorder.clone())
            .await
            .unwrap();
        let sent = recorder.sent.lock().unwrap().clone();
        (summary, sent)
    }

    #[tokio::test(start_paused = true)]
    async fn title_change_inside_window_sends_once() {
        let (summary, sent) = replay(&[
            r#"{"delayMs":100,"type":"mutations","records":[{"kind":"character_data","target":4,"text":"Docs"}]}"#,
        ])
        .await;

        assert_eq!(summary.events, 1);
        assert_eq!(summary.sent, 1);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].page_title, "Docs");
        assert_eq!(sent[0].h1_text, "Welcome");
        assert_eq!(summary.last_sent.unwrap().title, "Docs");
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_page_is_suppressed() {
        let (summary, sent) = replay(&[
            r#"{"delayMs":1000,"type":"focus"}"#,
        ])
        .await;

        assert_eq!(sent.len(), 1);
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.suppressed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_recording_still_reports_initial_state() {
        let (summary, sent) = replay(&[]).await;
        assert_eq!(summary.events, 0);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].page_url, "https://a.test/");
        assert_eq!(sent[0].page_title, "Home");
    }
}
