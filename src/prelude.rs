use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Common error type for the search pipeline.
#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("search cancelled after {0} pulses")]
    Cancelled(usize),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type SearchResult<T> = Result<T, SearchError>;

/// Cooperative cancellation handle checked between pulses during a
/// matched-filter batch. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_shares_state_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
