//! PageWatch runtime configuration schema.
//!
//! Every section and field is optional on disk; [`crate::apply_all_defaults`]
//! fills the gaps and the accessor methods fall back to the same constants.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::defaults::*;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWatchConfig {
    /// Embedded client settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientConfig>,

    /// Detection source tuning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<SignalsConfig>,

    /// Overlay detection strategies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<OverlayConfig>,

    /// Collector service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector: Option<CollectorConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl PageWatchConfig {
    pub fn client(&self) -> ClientConfig {
        self.client.clone().unwrap_or_default()
    }

    pub fn signals(&self) -> SignalsConfig {
        self.signals.clone().unwrap_or_default()
    }

    pub fn overlay(&self) -> OverlayConfig {
        self.overlay.clone().unwrap_or_default()
    }

    pub fn collector(&self) -> CollectorConfig {
        self.collector.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Collector URL used when the embedding script carries no `data-endpoint`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Selector locating the embedding script element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
}

impl ClientConfig {
    pub fn script_selector(&self) -> &str {
        self.script_selector.as_deref().unwrap_or(DEFAULT_SCRIPT_SELECTOR)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS))
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalsConfig {
    /// Also treat text edits under the body as structural changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observe_character_data: Option<bool>,

    /// Elements whose clicks open overlays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_click_selectors: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_delay_ms: Option<u64>,

    /// Host-specific event names that trigger immediately
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_events: Option<Vec<String>>,

    /// Legacy global functions to intercept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_functions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_max_attempts: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_retry_delay_ms: Option<u64>,

    /// Marker for modal/dialog-like inserted elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_insertion_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollConfig>,
}

impl SignalsConfig {
    pub fn observe_character_data(&self) -> bool {
        self.observe_character_data.unwrap_or(false)
    }

    pub fn trigger_click_selectors(&self) -> Vec<String> {
        self.trigger_click_selectors
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_TRIGGER_CLICK_SELECTOR.to_string()])
    }

    pub fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay_ms.unwrap_or(DEFAULT_CLICK_DELAY_MS))
    }

    pub fn custom_events(&self) -> Vec<String> {
        self.custom_events
            .clone()
            .unwrap_or_else(|| DEFAULT_CUSTOM_EVENTS.iter().map(|s| s.to_string()).collect())
    }

    pub fn wrap_functions(&self) -> Vec<String> {
        self.wrap_functions
            .clone()
            .unwrap_or_else(|| DEFAULT_WRAP_FUNCTIONS.iter().map(|s| s.to_string()).collect())
    }

    pub fn wrap_delay(&self) -> Duration {
        Duration::from_millis(self.wrap_delay_ms.unwrap_or(DEFAULT_WRAP_DELAY_MS))
    }

    pub fn wrap_max_attempts(&self) -> u32 {
        self.wrap_max_attempts.unwrap_or(DEFAULT_WRAP_MAX_ATTEMPTS)
    }

    pub fn wrap_retry_delay(&self) -> Duration {
        Duration::from_millis(self.wrap_retry_delay_ms.unwrap_or(DEFAULT_WRAP_RETRY_DELAY_MS))
    }

    pub fn overlay_insertion_selector(&self) -> &str {
        self.overlay_insertion_selector
            .as_deref()
            .unwrap_or(DEFAULT_OVERLAY_INSERTION_SELECTOR)
    }

    pub fn poll(&self) -> PollConfig {
        self.poll.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_overlay_selector: Option<String>,
}

impl PollConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn active_overlay_selector(&self) -> &str {
        self.active_overlay_selector
            .as_deref()
            .unwrap_or(DEFAULT_ACTIVE_OVERLAY_SELECTOR)
    }
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayConfig {
    /// Consulted in order; the first strategy that recognizes an overlay wins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategies: Option<Vec<OverlayStrategyConfig>>,
}

impl OverlayConfig {
    pub fn strategies(&self) -> Vec<OverlayStrategyConfig> {
        self.strategies.clone().unwrap_or_else(default_overlay_strategies)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayStrategyConfig {
    #[serde(rename_all = "camelCase")]
    AnchoredHeading {
        container: String,
        heading: String,
        #[serde(default = "default_strip")]
        strip: String,
    },
    #[serde(rename_all = "camelCase")]
    GenericModal {
        #[serde(default = "default_modal_visible")]
        visible: String,
        #[serde(default = "default_modal_candidates")]
        candidates: String,
        #[serde(default = "default_modal_heading")]
        heading: String,
        #[serde(default = "default_modal_title")]
        title: String,
        #[serde(default = "default_strip")]
        strip: String,
    },
}

impl OverlayStrategyConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AnchoredHeading { .. } => "anchored_heading",
            Self::GenericModal { .. } => "generic_modal",
        }
    }
}

fn default_strip() -> String {
    DEFAULT_STRIP_SELECTOR.to_string()
}

fn default_modal_visible() -> String {
    DEFAULT_MODAL_VISIBLE_SELECTOR.to_string()
}

fn default_modal_candidates() -> String {
    DEFAULT_MODAL_CANDIDATE_SELECTOR.to_string()
}

fn default_modal_heading() -> String {
    "h1".to_string()
}

fn default_modal_title() -> String {
    ".modal-title".to_string()
}

pub fn default_overlay_strategies() -> Vec<OverlayStrategyConfig> {
    vec![
        OverlayStrategyConfig::AnchoredHeading {
            container: DEFAULT_ANCHOR_CONTAINER_SELECTOR.to_string(),
            heading: DEFAULT_ANCHOR_HEADING_SELECTOR.to_string(),
            strip: default_strip(),
        },
        OverlayStrategyConfig::GenericModal {
            visible: default_modal_visible(),
            candidates: default_modal_candidates(),
            heading: default_modal_heading(),
            title: default_modal_title(),
            strip: default_strip(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Directory holding the dated CSV logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Per-field character cap before the ellipsis marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_limit: Option<usize>,
}

impl CollectorConfig {
    pub fn bind_address(&self) -> &str {
        self.bind_address.as_deref().unwrap_or(DEFAULT_BIND_ADDRESS)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_COLLECTOR_PORT)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_COLLECTOR_LOG_DIR))
    }

    pub fn field_limit(&self) -> usize {
        self.field_limit.unwrap_or(DEFAULT_FIELD_LIMIT)
    }

    /// Base URL the `status` command and local clients talk to.
    pub fn base_url(&self) -> String {
        let host = match self.bind_address() {
            "0.0.0.0" | "::" => "127.0.0.1",
            other => other,
        };
        format!("http://{}:{}", host, self.port())
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for the rolling JSON log file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}
