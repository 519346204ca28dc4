//! Signal Aggregator
//!
//! Owns every detection source and funnels host events through them into the
//! trigger bus. The host adapter calls [`SignalAggregator::dispatch`] for each
//! event; timer-driven signals (interception discovery, fallback poll) run as
//! their own tasks and are stopped through [`Installation::shutdown`].

use pagewatch_browser::{HostEvent, PageError, SharedPage};
use pagewatch_config::PageWatchConfig;
use pagewatch_core::{PageWatchError, TriggerSender, TriggerSource};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::click::TriggerClickSource;
use crate::events::{CustomEventSource, FocusSource, NavigationSource};
use crate::intercept::{DiscoveryPolicy, InterceptStatus, InterceptionRegistry};
use crate::mutation::{BodyMutationSource, TitleMutationSource};
use crate::overlay::OverlayInsertionSource;
use crate::poll::FallbackPoller;
use crate::source::{SignalContext, SignalError, SignalSource};

pub struct SignalAggregator {
    page: SharedPage,
    triggers: TriggerSender,
    sources: Vec<Box<dyn SignalSource>>,
    session_id: String,
}

/// Background pieces started by [`SignalAggregator::install`].
pub struct Installation {
    pub registry: InterceptionRegistry,
    pub intercepts: Vec<(String, watch::Receiver<InterceptStatus>)>,
    pub poller: Option<JoinHandle<()>>,
}

impl Installation {
    /// Stop the poll and any unfinished discovery. Wrappers already installed
    /// stay on the page.
    pub async fn shutdown(self) {
        if let Some(poller) = self.poller {
            poller.abort();
        }
        self.registry.shutdown().await;
    }
}

impl SignalAggregator {
    pub fn new(page: SharedPage, triggers: TriggerSender) -> Self {
        Self {
            page,
            triggers,
            sources: Vec::new(),
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn page(&self) -> &SharedPage {
        &self.page
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Attach `source` to the current document and keep it if that succeeds.
    /// A failed attach is logged and only this source is lost.
    pub async fn register(&mut self, mut source: Box<dyn SignalSource>) -> bool {
        let page = self.page.read().await;
        match source.attach(page.document()) {
            Ok(()) => {
                debug!(source = source.name(), "Signal source attached");
                self.sources.push(source);
                true
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "Failed to attach signal source");
                false
            }
        }
    }

    async fn register_built(&mut self, name: &str, built: Result<Box<dyn SignalSource>, SignalError>) {
        match built {
            Ok(source) => {
                self.register(source).await;
            }
            Err(e) => warn!(source = name, error = %e, "Failed to build signal source"),
        }
    }

    /// Register every source the configuration asks for and start the
    /// timer-driven ones.
    pub async fn install(&mut self, config: &PageWatchConfig) -> Installation {
        let signals = config.signals();

        self.register(Box::new(BodyMutationSource::new(signals.observe_character_data())))
            .await;
        self.register(Box::new(TitleMutationSource::new())).await;
        self.register_built(
            "overlay_insertion",
            OverlayInsertionSource::new(signals.overlay_insertion_selector())
                .map(|s| Box::new(s) as Box<dyn SignalSource>),
        )
        .await;
        self.register(Box::new(NavigationSource)).await;
        self.register(Box::new(FocusSource)).await;
        self.register(Box::new(CustomEventSource::new(signals.custom_events())))
            .await;

        let click_selectors = signals.trigger_click_selectors();
        if !click_selectors.is_empty() {
            self.register_built(
                "trigger_click",
                TriggerClickSource::new(&click_selectors, signals.click_delay())
                    .map(|s| Box::new(s) as Box<dyn SignalSource>),
            )
            .await;
        }

        let registry = InterceptionRegistry::new(
            self.page.clone(),
            self.triggers.downgrade(),
            signals.wrap_delay(),
        )
        .with_session_id(self.session_id.clone());
        let policy = DiscoveryPolicy::fixed(signals.wrap_max_attempts(), signals.wrap_retry_delay());
        let mut intercepts = Vec::new();
        for name in signals.wrap_functions() {
            let status = registry.intercept(&name, policy.clone()).await;
            intercepts.push((name, status));
        }

        let poll = signals.poll();
        let poller = if poll.enabled() {
            match FallbackPoller::new(
                self.page.clone(),
                self.triggers.downgrade(),
                poll.active_overlay_selector(),
                poll.interval(),
            ) {
                Ok(poller) => Some(poller.spawn()),
                Err(e) => {
                    warn!(error = %e, "Failed to start fallback poll");
                    None
                }
            }
        } else {
            debug!("Fallback poll disabled");
            None
        };

        info!(
            sources = ?self.source_names(),
            intercepts = intercepts.len(),
            poll = poller.is_some(),
            "Signal aggregator installed"
        );

        Installation {
            registry,
            intercepts,
            poller,
        }
    }

    /// Publish the initial-load trigger.
    pub fn start(&self) -> Result<(), PageWatchError> {
        self.triggers.fire(TriggerSource::Initial)
    }

    /// Apply one host event to the page, then let every source look at it.
    ///
    /// Source failures are logged and never returned. The result is the page's
    /// own outcome (a mutation it could not apply, or an error thrown by a
    /// called global), for the host adapter to surface.
    pub async fn dispatch(&mut self, event: &HostEvent) -> Result<(), PageError> {
        let mut page = self.page.write().await;
        let applied = page.apply(event);
        if let Err(e) = &applied {
            debug!(event = event.kind_name(), error = %e, "Host event partly applied");
        }

        let ctx = SignalContext {
            document: page.document(),
            triggers: &self.triggers,
        };
        for source in self.sources.iter_mut() {
            if let Err(e) = source.on_event(event, &ctx) {
                warn!(source = source.name(), event = event.kind_name(), error = %e, "Signal source failed");
            }
        }
        applied
    }
}
