//! Config validation: deep checks with user-friendly error messages.

use crate::schema::{OverlayStrategyConfig, PageWatchConfig};
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn require_selector(&mut self, path: impl Into<String>, selector: &str) {
        if selector.trim().is_empty() {
            self.error(path, "Selector cannot be empty");
        }
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &PageWatchConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_client(config, &mut report);
    validate_signals(config, &mut report);
    validate_overlay(config, &mut report);
    validate_collector(config, &mut report);
    report
}

fn validate_client(config: &PageWatchConfig, report: &mut ValidationReport) {
    let Some(client) = &config.client else { return };
    if client.debounce_ms == Some(0) {
        report.error("client.debounceMs", "debounceMs must be > 0");
    }
    if let Some(sel) = &client.script_selector {
        report.require_selector("client.scriptSelector", sel);
    }
    if let Some(endpoint) = &client.endpoint {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            report.error("client.endpoint", format!("Endpoint '{endpoint}' must be an http(s) URL"));
        }
    }
}

fn validate_signals(config: &PageWatchConfig, report: &mut ValidationReport) {
    let Some(signals) = &config.signals else { return };

    if signals.wrap_max_attempts == Some(0) {
        report.error("signals.wrapMaxAttempts", "wrapMaxAttempts must be >= 1");
    }
    if let Some(sel) = &signals.overlay_insertion_selector {
        report.require_selector("signals.overlayInsertionSelector", sel);
    }
    for (i, sel) in signals.trigger_click_selectors.iter().flatten().enumerate() {
        report.require_selector(format!("signals.triggerClickSelectors[{i}]"), sel);
    }
    for (i, name) in signals.wrap_functions.iter().flatten().enumerate() {
        if name.trim().is_empty() {
            report.error(format!("signals.wrapFunctions[{i}]"), "Function name cannot be empty");
        }
    }

    let Some(poll) = &signals.poll else { return };
    if poll.enabled == Some(false) {
        report.warn(
            "signals.poll.enabled",
            "Fallback poll disabled; overlays that change without DOM events will be missed",
        );
    }
    if poll.interval_ms == Some(0) {
        report.error("signals.poll.intervalMs", "intervalMs must be > 0");
    }
    if let Some(sel) = &poll.active_overlay_selector {
        report.require_selector("signals.poll.activeOverlaySelector", sel);
    }
}

fn validate_overlay(config: &PageWatchConfig, report: &mut ValidationReport) {
    let Some(overlay) = &config.overlay else { return };
    let Some(strategies) = &overlay.strategies else { return };
    if strategies.is_empty() {
        report.warn(
            "overlay.strategies",
            "No overlay strategies; only plain-document fields will be reported",
        );
    }
    for (i, strategy) in strategies.iter().enumerate() {
        let path = format!("overlay.strategies[{i}]");
        match strategy {
            OverlayStrategyConfig::AnchoredHeading { container, heading, .. } => {
                report.require_selector(format!("{path}.container"), container);
                report.require_selector(format!("{path}.heading"), heading);
            }
            OverlayStrategyConfig::GenericModal { candidates, heading, .. } => {
                report.require_selector(format!("{path}.candidates"), candidates);
                report.require_selector(format!("{path}.heading"), heading);
            }
        }
    }
}

fn validate_collector(config: &PageWatchConfig, report: &mut ValidationReport) {
    let Some(collector) = &config.collector else { return };
    if collector.port == Some(0) {
        report.error("collector.port", "port must be > 0");
    }
    if let Some(port) = collector.port {
        if port < 1024 && port != 80 && port != 443 {
            report.warn(
                "collector.port",
                format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
            );
        }
    }
    if collector.field_limit == Some(0) {
        report.error("collector.fieldLimit", "fieldLimit must be > 0");
    }
}
