//! The blocking session: persisted state, its transitions, and the expiry
//! alarm that ends it.

mod alarms;
mod machine;
mod state;

pub use alarms::{Alarm, AlarmScheduler, PendingAlarms, TokioAlarms, EXPIRY_ALARM};
pub use machine::{BlockingService, StartRequest};
pub use state::{BlockingSession, StopReason};
