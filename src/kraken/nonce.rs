//! Nonce generation for private calls
//!
//! The exchange rejects a private call whose nonce is not greater than the
//! previous one seen for the same API key.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of nonces for private calls
///
/// Any `Fn() -> u64` closure is a nonce source, which makes it easy to plug
/// in a counter shared with another process or a fixed value in tests.
/// Monotonicity of custom sources is the caller's responsibility.
pub trait NonceSource: Send + Sync {
    fn next_nonce(&self) -> u64;
}

impl<F> NonceSource for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn next_nonce(&self) -> u64 {
        self()
    }
}

/// Default nonce source: wall-clock microseconds, bumped past the last issued
/// value so two calls in the same microsecond still get distinct nonces
#[derive(Default)]
pub struct ClockNonce {
    last: AtomicU64,
}

impl ClockNonce {
    pub fn new() -> Self {
        Self::default()
    }

    fn now_micros() -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_micros()).unwrap_or(0)
    }
}

impl NonceSource for ClockNonce {
    fn next_nonce(&self) -> u64 {
        let now = Self::now_micros();
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(previous.saturating_add(1))
    }
}

impl fmt::Debug for ClockNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClockNonce")
            .field("last", &self.last.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_clock_nonce_strictly_increasing() {
        let source = ClockNonce::new();
        let mut previous = source.next_nonce();
        for _ in 0..10_000 {
            let next = source.next_nonce();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_clock_nonce_tracks_wall_clock() {
        let before = ClockNonce::now_micros();
        let nonce = ClockNonce::new().next_nonce();
        assert!(nonce >= before);
    }

    #[test]
    fn test_clock_nonce_unique_across_threads() {
        let source = Arc::new(ClockNonce::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = Arc::clone(&source);
                std::thread::spawn(move || (0..1_000).map(|_| s.next_nonce()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_closure_source() {
        let counter = AtomicU64::new(41);
        let source = move || counter.fetch_add(1, Ordering::SeqCst) + 1;
        assert_eq!(source.next_nonce(), 42);
        assert_eq!(source.next_nonce(), 43);
    }
}
