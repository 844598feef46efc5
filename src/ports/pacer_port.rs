//! Pacing port for rate-limited upstream sources.

use std::time::Duration;

/// Decides how long to wait between upstream calls.
///
/// Implementations may block; a zero-delay implementation is used in tests.
pub trait Pacer {
    /// Called after each symbol's retrieval, before the next one starts.
    fn wait(&self);

    /// Called before retrying a failed retrieval.
    fn backoff(&self, delay: Duration);
}
