use thiserror::Error;

/// Why a feed could not be rendered from live data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("response contained no items")]
    Empty,
}

impl FeedError {
    pub fn network(err: &anyhow::Error) -> Self {
        Self::Network(format!("{err:#}"))
    }

    /// Upstream errors get a message on screen; the rest fall back.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}
