//! One retry-free degradation policy shared by every external call site.
//!
//! A call is paced, bounded by a timeout, and on any failure (error, timeout,
//! rate limit) replaced by a caller-supplied fallback. Nothing escapes.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::AgentError;
use crate::pacing::Pacer;

/// Result of a degradable call: the real value or a labelled substitute.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Succeeded(T),
    Degraded { value: T, cause: String },
}

impl<T> Outcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Outcome::Succeeded(v) | Outcome::Degraded { value: v, .. } => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Succeeded(v) | Outcome::Degraded { value: v, .. } => v,
        }
    }

    pub fn cause(&self) -> Option<&str> {
        match self {
            Outcome::Succeeded(_) => None,
            Outcome::Degraded { cause, .. } => Some(cause),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }
}

#[derive(Debug)]
pub struct CallPolicy {
    timeout: Duration,
    pacer: Pacer,
}

impl CallPolicy {
    pub fn new(timeout: Duration, pacer: Pacer) -> Self {
        Self { timeout, pacer }
    }

    /// Pace and time-bound `call`, surfacing its error.
    pub async fn call<T, Fut>(&mut self, stage: &str, call: Fut) -> Result<T, AgentError>
    where
        Fut: Future<Output = Result<T, AgentError>>,
    {
        let waited = self.pacer.acquire().await;
        if !waited.is_zero() {
            debug!(stage, waited_ms = waited.as_millis() as u64, "Paced external call");
        }

        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout(self.timeout.as_secs())),
        };
        debug!(stage, elapsed_ms = start.elapsed().as_millis() as u64, ok = result.is_ok(), "External call finished");
        result
    }

    /// Like [`CallPolicy::call`], but any failure becomes `fallback(&error)`.
    pub async fn call_with_degradation<T, Fut, F>(
        &mut self,
        stage: &str,
        call: Fut,
        fallback: F,
    ) -> Outcome<T>
    where
        Fut: Future<Output = Result<T, AgentError>>,
        F: FnOnce(&AgentError) -> T,
    {
        match self.call(stage, call).await {
            Ok(value) => Outcome::Succeeded(value),
            Err(e) => {
                let kind = match &e {
                    AgentError::RateLimited(_) => "rate_limited",
                    AgentError::Timeout(_) => "timeout",
                    _ => "error",
                };
                warn!(stage, kind, error = %e, "External call failed, using fallback");
                Outcome::Degraded {
                    value: fallback(&e),
                    cause: e.to_string(),
                }
            }
        }
    }
}
