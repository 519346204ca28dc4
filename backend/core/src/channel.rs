use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::PageWatchError;
use crate::event::{Trigger, TriggerSource};

/// Default channel buffer size for the trigger fan-in.
const DEFAULT_BUFFER_SIZE: usize = 256;

pub type TriggerReceiver = mpsc::Receiver<Trigger>;

/// Fan-in bus between the detection sources and the reporter.
///
/// Every source publishes through a cloned [`TriggerSender`]; the reporter is the
/// single subscriber and takes the receiver exactly once.
pub struct TriggerBus {
    pub tx: TriggerSender,
    pub rx: Option<TriggerReceiver>,
}

impl TriggerBus {
    /// Create a new bus with the default buffer size.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new bus with a custom buffer size.
    pub fn with_buffer_size(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        info!(buffer_size = buffer, "TriggerBus initialized");
        Self {
            tx: TriggerSender { tx },
            rx: Some(rx),
        }
    }

    /// A publishing handle for one more source.
    pub fn sender(&self) -> TriggerSender {
        self.tx.clone()
    }

    /// Take the subscriber end (can only be called once).
    pub fn take_rx(&mut self) -> Option<TriggerReceiver> {
        debug!("Trigger receiver taken");
        self.rx.take()
    }
}

impl Default for TriggerBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishing half of the [`TriggerBus`].
#[derive(Debug, Clone)]
pub struct TriggerSender {
    tx: mpsc::Sender<Trigger>,
}

impl TriggerSender {
    /// Publish a recheck signal without waiting.
    ///
    /// A full buffer is not an error: the queued triggers already guarantee the
    /// reporter will look at the page again.
    pub fn fire(&self, source: TriggerSource) -> Result<(), PageWatchError> {
        match self.tx.try_send(Trigger::new(source)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                debug!(%source, "Trigger bus full, recheck already queued");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => {
                Err(PageWatchError::ChannelClosed("trigger bus".into()))
            }
        }
    }

    /// Publish a recheck signal after `delay`, giving asynchronously injected
    /// content time to land. Must be called from within a Tokio runtime.
    pub fn fire_after(&self, source: TriggerSource, delay: Duration) -> JoinHandle<()> {
        let sender = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = sender.fire(source) {
                debug!(%source, error = %e, "Delayed trigger dropped");
            }
        })
    }

    /// A handle that does not keep the bus open.
    pub fn downgrade(&self) -> WeakTriggerSender {
        WeakTriggerSender {
            tx: self.tx.downgrade(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Non-owning publisher, for callbacks stored inside the page model itself.
#[derive(Debug, Clone)]
pub struct WeakTriggerSender {
    tx: mpsc::WeakSender<Trigger>,
}

impl WeakTriggerSender {
    pub fn upgrade(&self) -> Option<TriggerSender> {
        self.tx.upgrade().map(|tx| TriggerSender { tx })
    }

    /// Like [`TriggerSender::fire_after`], silently dropped once the bus is gone.
    pub fn fire_after(&self, source: TriggerSource, delay: Duration) -> Option<JoinHandle<()>> {
        self.upgrade().map(|sender| sender.fire_after(source, delay))
    }
}
