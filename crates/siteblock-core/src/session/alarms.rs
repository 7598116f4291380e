//! One-shot expiry alarms.
//!
//! Alarms are best-effort: they may fire late, and they do not survive a
//! process restart. `BlockingService::check_expiry` covers the gap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::clock::Clock;

/// Name of the session expiry alarm.
pub const EXPIRY_ALARM: &str = "blockingTimer";

/// A scheduled wake-up, keyed to the session generation it was armed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub name: String,
    pub when_ms: u64,
    pub generation: u64,
}

impl Alarm {
    pub fn expiry(when_ms: u64, generation: u64) -> Self {
        Self {
            name: EXPIRY_ALARM.to_string(),
            when_ms,
            generation,
        }
    }
}

pub trait AlarmScheduler: Send + Sync {
    /// Schedule `alarm`, replacing any pending alarm with the same name.
    fn schedule_once(&self, alarm: Alarm);

    /// Cancel the pending alarm named `name`, if any.
    fn cancel(&self, name: &str);
}

/// Alarms backed by tokio sleep tasks. Fired alarms arrive on the receiver
/// returned by [`TokioAlarms::new`].
pub struct TokioAlarms {
    runtime: tokio::runtime::Handle,
    clock: Arc<dyn Clock>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
    fired_tx: mpsc::UnboundedSender<Alarm>,
}

impl TokioAlarms {
    pub fn new(
        runtime: tokio::runtime::Handle,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<Alarm>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let alarms = Self {
            runtime,
            clock,
            tasks: Mutex::new(HashMap::new()),
            fired_tx,
        };
        (alarms, fired_rx)
    }

    /// Poisoning is ignored: every handle must stay reachable to be aborted.
    fn tasks(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AlarmScheduler for TokioAlarms {
    fn schedule_once(&self, alarm: Alarm) {
        let delay = std::time::Duration::from_millis(alarm.when_ms.saturating_sub(self.clock.now_ms()));
        let name = alarm.name.clone();
        let fired_tx = self.fired_tx.clone();

        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired_tx.send(alarm);
        });

        if let Some(previous) = self.tasks().insert(name, handle) {
            previous.abort();
        }
    }

    fn cancel(&self, name: &str) {
        if let Some(handle) = self.tasks().remove(name) {
            handle.abort();
        }
    }
}

impl Drop for TokioAlarms {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}

/// Alarms that are only recorded, never fired on their own.
///
/// Short-lived processes use this and rely on `check_expiry`; tests use
/// [`PendingAlarms::take_due`] to fire alarms by hand.
#[derive(Debug, Default)]
pub struct PendingAlarms {
    alarms: Mutex<HashMap<String, Alarm>>,
}

impl PendingAlarms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Alarm> {
        self.alarms().get(name).cloned()
    }

    /// Remove and return every alarm due at `now_ms`.
    pub fn take_due(&self, now_ms: u64) -> Vec<Alarm> {
        let mut alarms = self.alarms();
        let due: Vec<String> = alarms
            .values()
            .filter(|a| a.when_ms <= now_ms)
            .map(|a| a.name.clone())
            .collect();
        due.iter().filter_map(|name| alarms.remove(name)).collect()
    }

    fn alarms(&self) -> MutexGuard<'_, HashMap<String, Alarm>> {
        self.alarms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AlarmScheduler for PendingAlarms {
    fn schedule_once(&self, alarm: Alarm) {
        self.alarms().insert(alarm.name.clone(), alarm);
    }

    fn cancel(&self, name: &str) {
        self.alarms().remove(name);
    }
}
