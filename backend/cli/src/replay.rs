//! NDJSON host-event recordings.
//!
//! The first non-blank line is the page load, every later line one host
//! event preceded by an optional pause:
//!
//! ```text
//! {"type":"load","url":"https://a.test/","document":{...}}
//! {"delayMs":250,"type":"click","target":12}
//! ```

use anyhow::{bail, Context, Result};
use pagewatch_browser::{HostEvent, PageLoad};
use serde::Deserialize;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Header {
    Load(PageLoad),
}

/// One recorded host event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayLine {
    /// Pause before delivering the event.
    #[serde(rename = "delayMs", default)]
    pub delay_ms: u64,
    #[serde(flatten)]
    pub event: HostEvent,
}

impl ReplayLine {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

pub struct ReplayReader<R> {
    lines: LinesStream<R>,
    line_no: usize,
}

impl<R: AsyncBufRead + Unpin> ReplayReader<R> {
    pub fn new(reader: R) -> Self {
        let lines: Lines<R> = reader.lines();
        Self {
            lines: LinesStream::new(lines),
            line_no: 0,
        }
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.lines.next().await {
            self.line_no += 1;
            let line = line.with_context(|| format!("failed to read line {}", self.line_no))?;
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    /// Read the leading `load` line.
    pub async fn read_load(&mut self) -> Result<PageLoad> {
        let Some(line) = self.next_line().await? else {
            bail!("recording is empty: expected a load line");
        };
        let Header::Load(load) = serde_json::from_str(&line)
            .with_context(|| format!("line {}: expected a load line", self.line_no))?;
        Ok(load)
    }

    /// Next host event, or `None` at end of input.
    pub async fn next_event(&mut self) -> Result<Option<ReplayLine>> {
        let Some(line) = self.next_line().await? else {
            return Ok(None);
        };
        let event = serde_json::from_str(&line)
            .with_context(|| format!("line {}: invalid host event", self.line_no))?;
        Ok(Some(event))
    }
}
