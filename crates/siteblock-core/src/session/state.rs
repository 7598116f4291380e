use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::storage::profiles::ProfileId;

/// The single persisted blocking session.
///
/// `active` holds iff `end_timestamp` is set. `generation` increases on every
/// start and stop and identifies which alarm or challenge belongs to which
/// session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingSession {
    pub active: bool,
    #[serde(default)]
    pub blocked_sites: Vec<Domain>,
    /// Absolute end time in epoch milliseconds.
    #[serde(default)]
    pub end_timestamp: Option<u64>,
    #[serde(default)]
    pub profile_id: Option<ProfileId>,
    #[serde(default)]
    pub generation: u64,
}

impl BlockingSession {
    /// An idle session carrying forward `generation`.
    pub fn idle(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    /// Active with an end time at or before `now_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.active && self.end_timestamp.map_or(true, |end| now_ms >= end)
    }

    /// Active and not yet expired.
    pub fn is_live(&self, now_ms: u64) -> bool {
        self.active && !self.is_expired(now_ms)
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        match self.end_timestamp {
            Some(end) if self.active => end.saturating_sub(now_ms),
            _ => 0,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Manual,
    Expired,
    ChallengeCompleted,
}
