//! Interception registry for legacy global functions.
//!
//! Pages that open overlays through global entry points get those functions
//! wrapped: the original still runs with its result or error untouched, and a
//! recheck is scheduled after a short delay either way. Globals that load late
//! are searched for under a bounded [`DiscoveryPolicy`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pagewatch_browser::{HostFunction, Page, ScriptError, SharedPage};
use pagewatch_core::{TriggerSource, WeakTriggerSender};
use pagewatch_logging::{TelemetryEvent, TelemetryLogger};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// How long to keep looking for a global that is not defined yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryPolicy {
    /// Lookups before giving up, the first one included.
    pub max_attempts: u32,
    /// Wait after the first failed lookup.
    pub delay: Duration,
    /// Multiplier applied to each subsequent wait.
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            delay: Duration::from_millis(200),
            backoff_factor: 1.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl DiscoveryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            ..Default::default()
        }
    }

    /// Wait after failed lookup number `attempt` (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let cap = self.max_delay.max(self.delay);
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let factor = self.backoff_factor.max(1.0).powi(exponent);
        // an overflowed factor never reaches Duration
        if !factor.is_finite() || self.delay.as_secs_f64() * factor >= cap.as_secs_f64() {
            return cap;
        }
        self.delay.mul_f64(factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InterceptStatus {
    /// Still looking; `attempt` lookups have failed so far.
    Searching { attempt: u32 },
    Wrapped { attempts: u32 },
    /// Never found within the policy.
    Abandoned { attempts: u32 },
}

impl InterceptStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Searching { .. })
    }
}

struct Interception {
    status: watch::Receiver<InterceptStatus>,
    task: JoinHandle<()>,
}

/// Wraps named globals on the shared page, once per name.
#[derive(Clone)]
pub struct InterceptionRegistry {
    page: SharedPage,
    triggers: WeakTriggerSender,
    trigger_delay: Duration,
    session_id: String,
    entries: Arc<Mutex<HashMap<String, Interception>>>,
}

impl InterceptionRegistry {
    pub fn new(page: SharedPage, triggers: WeakTriggerSender, trigger_delay: Duration) -> Self {
        Self {
            page,
            triggers,
            trigger_delay,
            session_id: String::new(),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Start intercepting `name`. Asking again for a name this registry already
    /// handles returns the existing status and does not wrap twice.
    pub async fn intercept(
        &self,
        name: &str,
        policy: DiscoveryPolicy,
    ) -> watch::Receiver<InterceptStatus> {
        let mut entries = self.entries.lock().await;
        if let Some(existing) = entries.get(name) {
            return existing.status.clone();
        }

        let (tx, rx) = watch::channel(InterceptStatus::Searching { attempt: 0 });
        let task = tokio::spawn(self.clone().discover(name.to_string(), policy, tx));
        entries.insert(
            name.to_string(),
            Interception {
                status: rx.clone(),
                task,
            },
        );
        rx
    }

    pub async fn status(&self, name: &str) -> Option<InterceptStatus> {
        let entries = self.entries.lock().await;
        entries.get(name).map(|e| *e.status.borrow())
    }

    /// Stop any discovery still in progress. Installed wrappers stay in place.
    pub async fn shutdown(&self) {
        let entries = self.entries.lock().await;
        for (name, entry) in entries.iter() {
            if !entry.task.is_finished() {
                debug!(function = %name, "Stopping global discovery");
                entry.task.abort();
            }
        }
    }

    async fn discover(self, name: String, policy: DiscoveryPolicy, status: watch::Sender<InterceptStatus>) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let wrapped = {
                let mut page = self.page.write().await;
                self.try_wrap(&mut page, &name)
            };

            if wrapped {
                info!(function = %name, attempts = attempt, "Intercepted global function");
                status.send_replace(InterceptStatus::Wrapped { attempts: attempt });
                self.record(&name, true, attempt);
                return;
            }
            if attempt >= policy.max_attempts.max(1) {
                debug!(function = %name, attempts = attempt, "Global never appeared; giving up");
                status.send_replace(InterceptStatus::Abandoned { attempts: attempt });
                self.record(&name, false, attempt);
                return;
            }

            status.send_replace(InterceptStatus::Searching { attempt });
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }
    }

    fn try_wrap(&self, page: &mut Page, name: &str) -> bool {
        let triggers = self.triggers.clone();
        let delay = self.trigger_delay;
        let function = name.to_string();
        page.globals_mut().replace(name, move |original| {
            let wrapper: HostFunction = Arc::new(move |args: &[Value]| -> Result<Value, ScriptError> {
                let result = original(args);
                if triggers
                    .fire_after(TriggerSource::InterceptedCall, delay)
                    .is_none()
                {
                    debug!(function = %function, "Trigger bus closed; call not tracked");
                }
                result
            });
            wrapper
        })
    }

    fn record(&self, name: &str, wrapped: bool, attempts: u32) {
        TelemetryLogger::log_event(
            &self.session_id,
            TelemetryEvent::InterceptResolved {
                function: name.to_string(),
                wrapped,
                attempts,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_browser::{NodeSpec, PageLoad};
    use pagewatch_core::TriggerBus;

    fn page() -> SharedPage {
        Page::new(PageLoad {
            url: "https://a.test/".into(),
            document: NodeSpec::element(1, "body"),
        })
        .unwrap()
        .shared()
    }

    fn define(page: &mut Page, name: &str, fails: bool) {
        let f: HostFunction = Arc::new(move |args: &[Value]| {
            if fails {
                Err(ScriptError::new("popup", "boom"))
            } else {
                Ok(Value::from(args.len()))
            }
        });
        page.globals_mut().define(name, f);
    }

    #[test]
    fn fixed_policy_delay_is_constant() {
        let policy = DiscoveryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(40), Duration::from_millis(200));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = DiscoveryPolicy {
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(1),
            ..Default::default()
        };
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(10), Duration::from_secs(1));
    }

    #[test]
    fn huge_attempt_counts_stay_at_the_cap() {
        let policy = DiscoveryPolicy {
            max_attempts: 2000,
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
            ..Default::default()
        };
        for attempt in 1..2000 {
            assert!(policy.delay_for(attempt) <= Duration::from_secs(5));
        }
        assert_eq!(policy.delay_for(1999), Duration::from_secs(5));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn wraps_existing_global_and_preserves_result() {
        let page = page();
        define(&mut *page.write().await, "rpShowDynamicModalDocument", false);
        let mut bus = TriggerBus::new();
        let mut rx = bus.take_rx().unwrap();
        let registry =
            InterceptionRegistry::new(page.clone(), bus.sender().downgrade(), Duration::from_millis(300));

        let mut status = registry
            .intercept("rpShowDynamicModalDocument", DiscoveryPolicy::default())
            .await;
        let resolved = *status.wait_for(InterceptStatus::is_final).await.unwrap();
        assert_eq!(resolved, InterceptStatus::Wrapped { attempts: 1 });

        let result = page
            .read()
            .await
            .globals()
            .call("rpShowDynamicModalDocument", &[Value::from(7), Value::from(8)])
            .unwrap();
        assert_eq!(result, Value::from(2));

        let trigger = rx.recv().await.unwrap();
        assert_eq!(trigger.source, TriggerSource::InterceptedCall);
    }

    #[tokio::test(start_paused = true)]
    async fn error_is_rethrown_and_still_triggers() {
        let page = page();
        define(&mut *page.write().await, "rpDocumentPropertiesPopup", true);
        let mut bus = TriggerBus::new();
        let mut rx = bus.take_rx().unwrap();
        let registry =
            InterceptionRegistry::new(page.clone(), bus.sender().downgrade(), Duration::from_millis(300));
        let mut status = registry
            .intercept("rpDocumentPropertiesPopup", DiscoveryPolicy::default())
            .await;
        status.wait_for(InterceptStatus::is_final).await.unwrap();

        let err = page
            .read()
            .await
            .globals()
            .call("rpDocumentPropertiesPopup", &[])
            .unwrap_err();
        assert_eq!(err.message, "boom");
        assert_eq!(rx.recv().await.unwrap().source, TriggerSource::InterceptedCall);
    }

    #[tokio::test(start_paused = true)]
    async fn late_global_is_found_by_retry() {
        let page = page();
        let bus = TriggerBus::new();
        let registry =
            InterceptionRegistry::new(page.clone(), bus.sender().downgrade(), Duration::from_millis(300));
        let mut status = registry
            .intercept("rpShowDynamicModalDocument", DiscoveryPolicy::default())
            .await;

        tokio::time::sleep(Duration::from_millis(650)).await;
        assert!(matches!(*status.borrow(), InterceptStatus::Searching { attempt } if attempt >= 3));

        page.write().await.globals_mut().define_stub("rpShowDynamicModalDocument");
        let resolved = *status.wait_for(InterceptStatus::is_final).await.unwrap();
        assert_eq!(resolved, InterceptStatus::Wrapped { attempts: 5 });
    }

    #[tokio::test(start_paused = true)]
    async fn missing_global_is_abandoned_after_cap() {
        let page = page();
        let bus = TriggerBus::new();
        let registry =
            InterceptionRegistry::new(page, bus.sender().downgrade(), Duration::from_millis(300));
        let mut status = registry
            .intercept("neverDefined", DiscoveryPolicy::fixed(3, Duration::from_millis(200)))
            .await;
        let resolved = *status.wait_for(InterceptStatus::is_final).await.unwrap();
        assert_eq!(resolved, InterceptStatus::Abandoned { attempts: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn second_intercept_does_not_double_wrap() {
        let page = page();
        define(&mut *page.write().await, "rpShowDynamicModalDocument", false);
        let mut bus = TriggerBus::new();
        let mut rx = bus.take_rx().unwrap();
        let registry =
            InterceptionRegistry::new(page.clone(), bus.sender().downgrade(), Duration::from_millis(300));

        let mut first = registry
            .intercept("rpShowDynamicModalDocument", DiscoveryPolicy::default())
            .await;
        first.wait_for(InterceptStatus::is_final).await.unwrap();
        let second = registry
            .intercept("rpShowDynamicModalDocument", DiscoveryPolicy::default())
            .await;
        assert_eq!(*second.borrow(), InterceptStatus::Wrapped { attempts: 1 });

        page.read()
            .await
            .globals()
            .call("rpShowDynamicModalDocument", &[])
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
