//! Blocking pacer implementations.

use crate::domain::settings::PacingConfig;
use crate::ports::pacer_port::Pacer;
use rand::Rng;
use std::time::Duration;

/// Sleeps `min_delay` plus a uniform random share of `jitter` between calls.
pub struct JitterPacer {
    min_delay: Duration,
    jitter: Duration,
}

impl JitterPacer {
    pub fn new(config: &PacingConfig) -> Self {
        Self {
            min_delay: config.min_delay,
            jitter: config.jitter,
        }
    }

    pub fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.min_delay + Duration::from_millis(extra)
    }
}

impl Pacer for JitterPacer {
    fn wait(&self) {
        let delay = self.next_delay();
        tracing::debug!(delay_ms = delay.as_millis() as u64, "pacing");
        std::thread::sleep(delay);
    }

    fn backoff(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Never waits. Used for local sources and when pacing is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelayPacer;

impl Pacer for NoDelayPacer {
    fn wait(&self) {}

    fn backoff(&self, _delay: Duration) {}
}

/// Picks the pacer matching `config.enabled`.
pub fn pacer_for(config: &PacingConfig) -> Box<dyn Pacer + Send + Sync> {
    if config.enabled {
        Box::new(JitterPacer::new(config))
    } else {
        Box::new(NoDelayPacer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_stays_within_bounds() {
        let pacer = JitterPacer::new(&PacingConfig {
            min_delay: Duration::from_millis(100),
            jitter: Duration::from_millis(50),
            ..Default::default()
        });
        for _ in 0..100 {
            let d = pacer.next_delay();
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_millis(150));
        }
    }

    #[test]
    fn zero_jitter_is_fixed() {
        let pacer = JitterPacer::new(&PacingConfig {
            min_delay: Duration::from_millis(5),
            jitter: Duration::ZERO,
            ..Default::default()
        });
        assert_eq!(pacer.next_delay(), Duration::from_millis(5));
    }

    #[test]
    fn no_delay_pacer_returns_immediately() {
        let start = std::time::Instant::now();
        let pacer = NoDelayPacer;
        pacer.wait();
        pacer.backoff(Duration::from_secs(10));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
