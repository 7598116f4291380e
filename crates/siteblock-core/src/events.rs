use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::rules::RuleSync;
use crate::session::StopReason;

/// How a rule install attempt went. Failures are reported here instead of
/// failing the transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleStatus {
    Synced { removed: usize, added: usize },
    Failed { message: String },
}

impl From<RuleSync> for RuleStatus {
    fn from(sync: RuleSync) -> Self {
        RuleStatus::Synced {
            removed: sync.removed,
            added: sync.added,
        }
    }
}

/// Every session transition produces an Event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    BlockingStarted {
        sites: Vec<Domain>,
        end_timestamp: u64,
        generation: u64,
        rules: RuleStatus,
        at: DateTime<Utc>,
    },
    BlockingStopped {
        reason: StopReason,
        /// False when stop was a no-op on an idle session.
        was_active: bool,
        rules: RuleStatus,
        at: DateTime<Utc>,
    },
    /// `check_expiry` found a live session and re-installed its rules.
    RulesReasserted {
        generation: u64,
        rules: RuleStatus,
        at: DateTime<Utc>,
    },
    /// An alarm fired for a session that was already replaced or cleared.
    AlarmIgnored {
        name: String,
        alarm_generation: u64,
        session_generation: u64,
        at: DateTime<Utc>,
    },
}
