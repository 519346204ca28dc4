use thiserror::Error;

/// Top-level error type for the PageWatch client engine.
#[derive(Debug, Error)]
pub enum PageWatchError {
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("collector rejected report with status {status}")]
    Transport { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid selector: {0}")]
    Selector(String),

    #[error("script error: {0}")]
    Script(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PageWatchError {
    /// True for failures of a single transmission attempt (network or HTTP status).
    pub fn is_transmission(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Network(_))
    }
}
