//! Monotonic request tokens
//!
//! A component that switches context takes a new token; handlers of older
//! requests compare their token with the current one and drop their result.
//! Requests are never cancelled.

use std::sync::atomic::{AtomicU64, Ordering};

/// Token handed to one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// Source of monotonically increasing tokens.
#[derive(Debug, Default)]
pub struct RequestSequence {
    current: AtomicU64,
}

impl RequestSequence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier token.
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether no newer request has started since `token` was issued.
    #[must_use]
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current.load(Ordering::SeqCst) == token.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_token_is_current() {
        let seq = RequestSequence::new();
        let first = seq.begin();
        assert!(seq.is_current(first));
        let second = seq.begin();
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
        assert!(second > first);
    }
}
