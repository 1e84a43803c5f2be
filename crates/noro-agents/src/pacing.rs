//! Minimum spacing between successive external calls.
//!
//! A single-token bucket: one call may start per `min_spacing`. Each pipeline
//! run owns its own pacer, so concurrent runs never contend on it.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Pacer {
    min_spacing: Duration,
    last_call: Option<Instant>,
}

impl Pacer {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_call: None,
        }
    }

    /// A pacer that never waits.
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Time left before the next call may start.
    pub fn remaining(&self) -> Duration {
        match self.last_call {
            Some(last) => self.min_spacing.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Wait out the spacing window, then claim the slot. Returns time waited.
    pub async fn acquire(&mut self) -> Duration {
        let wait = self.remaining();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        self.last_call = Some(Instant::now());
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_call_is_immediate() {
        let mut pacer = Pacer::new(Duration::from_secs(60));
        assert_eq!(pacer.acquire().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn second_call_waits_for_spacing() {
        let spacing = Duration::from_millis(40);
        let mut pacer = Pacer::new(spacing);
        pacer.acquire().await;
        let start = Instant::now();
        pacer.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[tokio::test]
    async fn no_wait_after_spacing_elapsed() {
        let mut pacer = Pacer::new(Duration::from_millis(10));
        pacer.acquire().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(pacer.remaining(), Duration::ZERO);
    }

    #[tokio::test]
    async fn unpaced_never_waits() {
        let mut pacer = Pacer::unpaced();
        for _ in 0..5 {
            assert_eq!(pacer.acquire().await, Duration::ZERO);
        }
    }
}
