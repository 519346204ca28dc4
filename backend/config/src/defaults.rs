//! Config defaults: the constants every accessor falls back to, and the pass
//! that writes them into a freshly loaded config.

use crate::schema::{
    default_overlay_strategies, ClientConfig, CollectorConfig, LoggingConfig, OverlayConfig,
    PageWatchConfig, PollConfig, SignalsConfig,
};

/// Quiet period after the last trigger before a send is attempted.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

pub const DEFAULT_SCRIPT_SELECTOR: &str = "script[data-endpoint]";

/// Links that open document overlays.
pub const DEFAULT_TRIGGER_CLICK_SELECTOR: &str =
    "a[href^=\"#rpShowDynamicModalDocument-\"], a.rp-search-result-heading";

/// Delay between a trigger click and the recheck, so the overlay can render.
pub const DEFAULT_CLICK_DELAY_MS: u64 = 300;

pub const DEFAULT_CUSTOM_EVENTS: &[&str] = &["shown.bs.modal"];

/// Legacy popup-opening globals.
pub const DEFAULT_WRAP_FUNCTIONS: &[&str] =
    &["rpShowDynamicModalDocument", "rpDocumentPropertiesPopup"];

pub const DEFAULT_WRAP_DELAY_MS: u64 = 300;

pub const DEFAULT_WRAP_MAX_ATTEMPTS: u32 = 50;

pub const DEFAULT_WRAP_RETRY_DELAY_MS: u64 = 200;

pub const DEFAULT_OVERLAY_INSERTION_SELECTOR: &str = ".modal, [role=\"dialog\"]";

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

pub const DEFAULT_ACTIVE_OVERLAY_SELECTOR: &str = ".modal.show, .modal.in";

pub const DEFAULT_ANCHOR_CONTAINER_SELECTOR: &str = ".rprtc-ajaxmodal";

pub const DEFAULT_ANCHOR_HEADING_SELECTOR: &str = "#pnlHeading h1";

pub const DEFAULT_MODAL_VISIBLE_SELECTOR: &str = ".modal.show, .modal.in";

pub const DEFAULT_MODAL_CANDIDATE_SELECTOR: &str = ".modal, [role=\"dialog\"]";

/// Controls removed from heading text before it is read.
pub const DEFAULT_STRIP_SELECTOR: &str = "button, .close";

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

pub const DEFAULT_COLLECTOR_PORT: u16 = 3000;

pub const DEFAULT_COLLECTOR_LOG_DIR: &str = "logs";

/// Characters kept per CSV field before the ellipsis marker.
pub const DEFAULT_FIELD_LIMIT: usize = 500;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: PageWatchConfig) -> PageWatchConfig {
    let config = apply_client_defaults(config);
    let config = apply_signal_defaults(config);
    let config = apply_overlay_defaults(config);
    let config = apply_collector_defaults(config);
    apply_logging_defaults(config)
}

fn apply_client_defaults(mut config: PageWatchConfig) -> PageWatchConfig {
    let client = config.client.get_or_insert_with(ClientConfig::default);
    client
        .script_selector
        .get_or_insert_with(|| DEFAULT_SCRIPT_SELECTOR.to_string());
    client.debounce_ms.get_or_insert(DEFAULT_DEBOUNCE_MS);
    config
}

fn apply_signal_defaults(mut config: PageWatchConfig) -> PageWatchConfig {
    let signals = config.signals.get_or_insert_with(SignalsConfig::default);
    let resolved = signals.clone();

    signals
        .observe_character_data
        .get_or_insert(resolved.observe_character_data());
    signals
        .trigger_click_selectors
        .get_or_insert_with(|| resolved.trigger_click_selectors());
    signals.click_delay_ms.get_or_insert(DEFAULT_CLICK_DELAY_MS);
    signals
        .custom_events
        .get_or_insert_with(|| resolved.custom_events());
    signals
        .wrap_functions
        .get_or_insert_with(|| resolved.wrap_functions());
    signals.wrap_delay_ms.get_or_insert(DEFAULT_WRAP_DELAY_MS);
    signals.wrap_max_attempts.get_or_insert(DEFAULT_WRAP_MAX_ATTEMPTS);
    signals
        .wrap_retry_delay_ms
        .get_or_insert(DEFAULT_WRAP_RETRY_DELAY_MS);
    signals
        .overlay_insertion_selector
        .get_or_insert_with(|| DEFAULT_OVERLAY_INSERTION_SELECTOR.to_string());

    let poll = signals.poll.get_or_insert_with(PollConfig::default);
    poll.enabled.get_or_insert(true);
    poll.interval_ms.get_or_insert(DEFAULT_POLL_INTERVAL_MS);
    poll.active_overlay_selector
        .get_or_insert_with(|| DEFAULT_ACTIVE_OVERLAY_SELECTOR.to_string());
    config
}

fn apply_overlay_defaults(mut config: PageWatchConfig) -> PageWatchConfig {
    let overlay = config.overlay.get_or_insert_with(OverlayConfig::default);
    overlay.strategies.get_or_insert_with(default_overlay_strategies);
    config
}

fn apply_collector_defaults(mut config: PageWatchConfig) -> PageWatchConfig {
    let collector = config.collector.get_or_insert_with(CollectorConfig::default);
    collector
        .bind_address
        .get_or_insert_with(|| DEFAULT_BIND_ADDRESS.to_string());
    collector.port.get_or_insert(DEFAULT_COLLECTOR_PORT);
    collector
        .log_dir
        .get_or_insert_with(|| DEFAULT_COLLECTOR_LOG_DIR.into());
    collector.field_limit.get_or_insert(DEFAULT_FIELD_LIMIT);
    config
}

fn apply_logging_defaults(mut config: PageWatchConfig) -> PageWatchConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(PageWatchConfig::default());
        assert_eq!(cfg.client.unwrap().debounce_ms, Some(DEFAULT_DEBOUNCE_MS));
        let signals = cfg.signals.unwrap();
        assert_eq!(signals.wrap_max_attempts, Some(50));
        assert_eq!(signals.poll.unwrap().enabled, Some(true));
        assert_eq!(cfg.overlay.unwrap().strategies.unwrap().len(), 2);
        assert_eq!(cfg.collector.unwrap().field_limit, Some(500));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = PageWatchConfig::default();
        cfg.client = Some(ClientConfig {
            debounce_ms: Some(120),
            ..Default::default()
        });
        cfg.signals = Some(SignalsConfig {
            wrap_functions: Some(vec![]),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.client.unwrap().debounce_ms, Some(120));
        assert_eq!(cfg.signals.unwrap().wrap_functions, Some(vec![]));
    }
}
