//! `pagewatch status`: ask a running collector for its health report.

use std::time::Duration;

use anyhow::Result;
use pagewatch_config::PageWatchConfig;

pub async fn run(config: &PageWatchConfig) -> Result<()> {
    let base = config.collector().base_url();
    println!("PageWatch collector at {base}: checking...");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    match client.get(format!("{base}/api/health")).send().await {
        Ok(resp) if resp.status().is_success() => {
            let body: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Ok(resp) => {
            println!("Collector answered with HTTP {}", resp.status());
        }
        Err(_) => {
            println!("PageWatch collector is not running at {base}");
        }
    }
    Ok(())
}
