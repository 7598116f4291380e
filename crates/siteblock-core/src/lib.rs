//! # SiteBlock Core Library
//!
//! Core logic for SiteBlock, a time-boxed website blocker. Every operation
//! is available through the library and the `siteblock-cli` binary; a
//! browser extension or desktop UI is a thin layer over the same core.
//!
//! ## Architecture
//!
//! - **Domain Matcher**: canonical site form and hostname matching
//! - **Rule Programmer**: declarative redirect rules, installed best-effort
//! - **Session State Machine**: start/stop/expiry of the single blocking
//!   session, serialized through one lock and keyed by generation
//! - **Challenge Engine**: arithmetic problems that end a session early
//! - **Enforcement Hook**: the authoritative per-navigation check
//! - **Storage**: key-value persistence (SQLite or in-memory) and TOML config
//!
//! ## Key Components
//!
//! - [`BlockingService`]: owner of the session and its challenge
//! - [`EnforcementHook`]: allow/redirect decisions
//! - [`Command`] and [`dispatch`]: the JSON message surface
//! - [`SqliteStore`]: durable key-value store
//! - [`Config`]: application configuration management

pub mod challenge;
pub mod clock;
pub mod command;
pub mod display;
pub mod domain;
pub mod enforcement;
pub mod error;
pub mod events;
pub mod rules;
pub mod session;
pub mod storage;

pub use challenge::{ChallengeState, Difficulty, Problem, SubmitOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{dispatch, dispatch_json, Command, Response};
pub use domain::{matches, normalize, Domain};
pub use enforcement::{EnforcementHook, NavigationDecision};
pub use error::{ConfigError, CoreError, RuleError, StorageError, ValidationError};
pub use events::{Event, RuleStatus};
pub use rules::{RuleFacility, RuleProgrammer, StoredRuleSet};
pub use session::{
    Alarm, AlarmScheduler, BlockingService, BlockingSession, PendingAlarms, StartRequest,
    StopReason, TokioAlarms,
};
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore};
