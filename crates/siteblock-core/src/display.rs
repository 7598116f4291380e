//! State reads for display surfaces (block page, status line).
//!
//! Unlike session transitions, these reads retry with a bounded backoff and
//! fall back to a degraded snapshot rather than surfacing an error.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::session::{BlockingService, BlockingSession};
use crate::storage::DisplayConfig;

/// Bounded retry for display reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&DisplayConfig::default())
    }
}

impl From<&DisplayConfig> for RetryPolicy {
    fn from(config: &DisplayConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
        }
    }
}

/// What a display surface should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisplayState {
    Blocking { end_timestamp: u64, remaining_ms: u64 },
    Idle,
    Unavailable { message: String },
}

impl DisplayState {
    fn from_session(session: &BlockingSession, now_ms: u64) -> Self {
        match session.end_timestamp {
            Some(end_timestamp) if session.is_live(now_ms) => DisplayState::Blocking {
                end_timestamp,
                remaining_ms: session.remaining_ms(now_ms),
            },
            _ => DisplayState::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRead {
    pub state: DisplayState,
    /// Attempts made through the healing read path.
    pub attempts: u32,
    /// True when the state came from the fallback snapshot read.
    pub degraded: bool,
}

/// Read the session for display.
///
/// Tries `get_state` up to `1 + max_retries` times, each bounded by
/// `attempt_timeout` and separated by `backoff`. If every attempt fails,
/// reads the raw snapshot once; if that fails too the state is
/// [`DisplayState::Unavailable`].
pub async fn fetch_state_for_display(service: Arc<BlockingService>, policy: &RetryPolicy) -> DisplayRead {
    let attempts = policy.max_retries + 1;
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        let worker = service.clone();
        let read = tokio::task::spawn_blocking(move || worker.get_state());

        match tokio::time::timeout(policy.attempt_timeout, read).await {
            Ok(Ok(Ok(session))) => {
                return DisplayRead {
                    state: DisplayState::from_session(&session, service.clock().now_ms()),
                    attempts: attempt,
                    degraded: false,
                };
            }
            Ok(Ok(Err(e))) => last_error = e.to_string(),
            Ok(Err(e)) => last_error = e.to_string(),
            Err(_) => last_error = format!("timed out after {:?}", policy.attempt_timeout),
        }

        tracing::warn!(attempt, attempts, error = %last_error, "display read failed");
        if attempt < attempts {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    let state = match service.snapshot() {
        Ok(session) => DisplayState::from_session(&session, service.clock().now_ms()),
        Err(e) => {
            tracing::error!(error = %e, "fallback display read failed");
            DisplayState::Unavailable {
                message: format!("{last_error}; fallback: {e}"),
            }
        }
    };
    DisplayRead {
        state,
        attempts,
        degraded: true,
    }
}

/// Format a countdown as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_countdown(remaining_ms: u64) -> String {
    let total_secs = remaining_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
