//! Blocking session state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Active --stop | expiry | challenge solved--> Idle
//! ```
//!
//! The challenge is an overlay on `Active`, not a separate persisted state.
//! `start`, `stop`, `check_expiry`, alarm handling and challenge grading all
//! run under one transition lock, so a late alarm cannot interleave with a
//! new `start`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::alarms::{Alarm, AlarmScheduler, EXPIRY_ALARM};
use super::state::{BlockingSession, StopReason};
use crate::challenge::{ChallengeState, Difficulty, SubmitOutcome};
use crate::clock::{to_datetime, Clock, SystemClock};
use crate::domain::{normalize_all, Domain};
use crate::error::{CoreError, Result, ValidationError};
use crate::events::{Event, RuleStatus};
use crate::rules::{RuleProgrammer, StoredRuleSet};
use crate::storage::{
    keys, Config, DistractionNote, KeyValueStore, KeyValueStoreExt, NoteStore, ProfileStore,
};

const MS_PER_MINUTE: i64 = 60_000;

/// Parameters for [`BlockingService::start`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Raw site strings. When empty and `profile_id` is set, the profile's
    /// sites are used.
    #[serde(default)]
    pub sites: Vec<String>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub profile_id: Option<String>,
}

/// Owner of the blocking session and the challenge attached to it.
pub struct BlockingService {
    store: Arc<dyn KeyValueStore>,
    rules: RuleProgrammer,
    alarms: Arc<dyn AlarmScheduler>,
    clock: Arc<dyn Clock>,
    default_difficulty: Difficulty,
    transitions: Mutex<()>,
}

impl BlockingService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        rules: RuleProgrammer,
        alarms: Arc<dyn AlarmScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            rules,
            alarms,
            clock,
            default_difficulty: Difficulty::default(),
            transitions: Mutex::new(()),
        }
    }

    /// Wire a service from configuration: rules are kept in `store`, time
    /// comes from the system clock.
    pub fn from_config(
        store: Arc<dyn KeyValueStore>,
        config: &Config,
        alarms: Arc<dyn AlarmScheduler>,
    ) -> Self {
        let facility = StoredRuleSet::new(store.clone(), config.blocking.max_dynamic_rules);
        let rules = RuleProgrammer::new(Arc::new(facility), config.blocking.block_page_url.clone());
        Self::new(store, rules, alarms, Arc::new(SystemClock))
            .with_default_difficulty(config.challenge.default_difficulty)
    }

    pub fn with_default_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.default_difficulty = difficulty;
        self
    }

    pub fn rules(&self) -> &RuleProgrammer {
        &self.rules
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn profiles(&self) -> ProfileStore {
        ProfileStore::new(self.store.clone())
    }

    pub fn notes(&self) -> NoteStore {
        NoteStore::new(self.store.clone(), self.clock.clone())
    }

    /// Seed missing storage keys with defaults, then run `check_expiry`.
    ///
    /// Call once on process start.
    pub fn initialize(&self) -> Result<Option<Event>> {
        let present = self.store.get(&[
            keys::BLOCKING_STATE,
            keys::PROFILES,
            keys::MATH_DIFFICULTY,
            keys::DISTRACTION_NOTES,
        ])?;

        let mut defaults = HashMap::new();
        let mut seed = |key: &str, value: serde_json::Value| {
            if !present.contains_key(key) {
                defaults.insert(key.to_string(), value);
            }
        };
        seed(keys::BLOCKING_STATE, serde_json::to_value(BlockingSession::default())?);
        seed(keys::PROFILES, serde_json::Value::Array(Vec::new()));
        seed(keys::MATH_DIFFICULTY, serde_json::to_value(self.default_difficulty)?);
        seed(keys::DISTRACTION_NOTES, serde_json::Value::Array(Vec::new()));

        if !defaults.is_empty() {
            self.store.set(defaults)?;
        }
        self.check_expiry()
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Start (or replace) the blocking session.
    ///
    /// The session is persisted first; rule installation failures are
    /// logged and reported in the event, never returned.
    pub fn start(&self, request: StartRequest) -> Result<Event> {
        if request.duration_minutes <= 0 {
            return Err(ValidationError::InvalidDuration(request.duration_minutes).into());
        }
        let duration_ms = request
            .duration_minutes
            .checked_mul(MS_PER_MINUTE)
            .ok_or(ValidationError::InvalidDuration(request.duration_minutes))?;

        let sites = self.resolve_sites(&request)?;

        let _guard = self.lock();
        let previous = self.load_session()?;
        let now = self.clock.now_ms();
        let end_timestamp = now.saturating_add(duration_ms as u64);
        let generation = previous.generation + 1;

        let session = BlockingSession {
            active: true,
            blocked_sites: sites.clone(),
            end_timestamp: Some(end_timestamp),
            profile_id: request.profile_id.filter(|id| !id.is_empty()),
            generation,
        };
        self.store.write(keys::BLOCKING_STATE, &session)?;
        self.store.remove(&[keys::MATH_CHALLENGE_STATE])?;

        let rules = self.sync_rules(&sites);
        self.alarms.schedule_once(Alarm::expiry(end_timestamp, generation));

        tracing::info!(
            sites = sites.len(),
            end_timestamp,
            generation,
            "blocking session started"
        );
        Ok(Event::BlockingStarted {
            sites,
            end_timestamp,
            generation,
            rules,
            at: to_datetime(now),
        })
    }

    /// End the session. Calling this on an idle session is a no-op with the
    /// same end state.
    pub fn stop(&self, reason: StopReason) -> Result<Event> {
        let _guard = self.lock();
        self.stop_locked(reason)
    }

    /// Clear an expired session, or re-assert rules and the expiry alarm for
    /// a live one. Compensates for alarms lost across restarts.
    ///
    /// Returns `None` when idle.
    pub fn check_expiry(&self) -> Result<Option<Event>> {
        let _guard = self.lock();
        self.check_expiry_locked()
    }

    /// Handle a fired alarm. Alarms armed for an older generation are
    /// ignored.
    pub fn on_alarm(&self, alarm: &Alarm) -> Result<Event> {
        let _guard = self.lock();
        let session = self.load_session()?;
        let now = self.clock.now_ms();

        if alarm.name != EXPIRY_ALARM || !session.active || session.generation != alarm.generation {
            tracing::warn!(
                alarm = %alarm.name,
                alarm_generation = alarm.generation,
                session_generation = session.generation,
                "ignoring stale alarm"
            );
            return Ok(Event::AlarmIgnored {
                name: alarm.name.clone(),
                alarm_generation: alarm.generation,
                session_generation: session.generation,
                at: to_datetime(now),
            });
        }

        if session.is_expired(now) {
            self.stop_locked(StopReason::Expired)
        } else {
            // Fired early; re-arm for the real end time.
            let rules = self.sync_rules(&session.blocked_sites);
            self.rearm(&session);
            Ok(Event::RulesReasserted {
                generation: session.generation,
                rules,
                at: to_datetime(now),
            })
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Current session, after clearing it if it has expired.
    pub fn get_state(&self) -> Result<BlockingSession> {
        let _guard = self.lock();
        self.check_expiry_locked()?;
        self.load_session()
    }

    /// Read the persisted session without taking the transition lock or
    /// healing expiry. May be one transition stale.
    pub fn snapshot(&self) -> Result<BlockingSession> {
        self.load_session()
    }

    // ── Challenge ────────────────────────────────────────────────────

    /// Generate a new challenge for the live session, replacing any
    /// challenge in progress. Uses the stored difficulty setting when
    /// `difficulty` is `None`.
    pub fn generate_challenge(&self, difficulty: Option<Difficulty>) -> Result<ChallengeState> {
        let _guard = self.lock();
        self.check_expiry_locked()?;
        let session = self.load_session()?;
        if !session.active {
            return Err(CoreError::NoActiveSession);
        }

        let difficulty = match difficulty {
            Some(d) => d,
            None => self.difficulty()?,
        };
        let challenge = ChallengeState::generate(difficulty, session.generation, &mut rand::thread_rng());
        self.store.write(keys::MATH_CHALLENGE_STATE, &challenge)?;

        tracing::info!(%difficulty, problems = challenge.problems.len(), "challenge generated");
        Ok(challenge)
    }

    /// Grade an answer. Solving the last problem stops the session.
    pub fn submit_answer(&self, raw: &str) -> Result<SubmitOutcome> {
        let _guard = self.lock();
        self.check_expiry_locked()?;
        let mut challenge = self.load_challenge()?.ok_or(CoreError::NoActiveChallenge)?;

        let outcome = challenge.submit(raw)?;
        if outcome.completed {
            tracing::info!("challenge completed");
            self.stop_locked(StopReason::ChallengeCompleted)?;
        } else if outcome.correct {
            self.store.write(keys::MATH_CHALLENGE_STATE, &challenge)?;
        }
        Ok(outcome)
    }

    /// The challenge in progress, if any.
    pub fn challenge_state(&self) -> Result<Option<ChallengeState>> {
        let _guard = self.lock();
        self.check_expiry_locked()?;
        self.load_challenge()
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn difficulty(&self) -> Result<Difficulty> {
        Ok(self
            .store
            .read(keys::MATH_DIFFICULTY)?
            .unwrap_or(self.default_difficulty))
    }

    pub fn set_difficulty(&self, difficulty: Difficulty) -> Result<()> {
        self.store.write(keys::MATH_DIFFICULTY, &difficulty)?;
        Ok(())
    }

    pub fn add_note(&self, text: &str) -> Result<DistractionNote> {
        self.notes().add(text)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.transitions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve_sites(&self, request: &StartRequest) -> Result<Vec<Domain>> {
        let mut sites = normalize_all(&request.sites);
        if sites.is_empty() {
            if let Some(id) = request.profile_id.as_deref().filter(|id| !id.is_empty()) {
                let profile = self
                    .profiles()
                    .get(id)?
                    .ok_or_else(|| ValidationError::ProfileNotFound(id.to_string()))?;
                sites = profile.sites;
            }
        }
        if sites.is_empty() {
            return Err(ValidationError::EmptySiteList.into());
        }
        Ok(sites)
    }

    fn stop_locked(&self, reason: StopReason) -> Result<Event> {
        let session = self.load_session()?;
        let was_active = session.active;
        let generation = if was_active {
            session.generation + 1
        } else {
            session.generation
        };

        self.store
            .write(keys::BLOCKING_STATE, &BlockingSession::idle(generation))?;
        let rules = self.sync_rules(&[]);
        self.store.remove(&[keys::MATH_CHALLENGE_STATE])?;
        self.alarms.cancel(EXPIRY_ALARM);

        if was_active {
            tracing::info!(?reason, "blocking session stopped");
        }
        Ok(Event::BlockingStopped {
            reason,
            was_active,
            rules,
            at: to_datetime(self.clock.now_ms()),
        })
    }

    fn check_expiry_locked(&self) -> Result<Option<Event>> {
        let session = self.load_session()?;
        let now = self.clock.now_ms();

        if session.is_expired(now) {
            return self.stop_locked(StopReason::Expired).map(Some);
        }
        if session.active {
            let rules = self.sync_rules(&session.blocked_sites);
            self.rearm(&session);
            return Ok(Some(Event::RulesReasserted {
                generation: session.generation,
                rules,
                at: to_datetime(now),
            }));
        }

        // Idle: clear any rules left behind by an interrupted stop.
        self.sync_rules(&[]);
        Ok(None)
    }

    fn rearm(&self, session: &BlockingSession) {
        if let Some(end) = session.end_timestamp {
            self.alarms.schedule_once(Alarm::expiry(end, session.generation));
        }
    }

    /// Install rules for `sites`, logging instead of failing.
    ///
    /// Rules are only an optimization: `EnforcementHook` checks every
    /// navigation against the persisted session whether or not this
    /// succeeded.
    fn sync_rules(&self, sites: &[Domain]) -> RuleStatus {
        match self.rules.install(sites) {
            Ok(sync) => sync.into(),
            Err(e) => {
                tracing::warn!(error = %e, sites = sites.len(), "failed to install blocking rules");
                RuleStatus::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    fn load_session(&self) -> Result<BlockingSession> {
        Ok(self.store.read(keys::BLOCKING_STATE)?.unwrap_or_default())
    }

    /// The stored challenge, if it belongs to the current live session.
    fn load_challenge(&self) -> Result<Option<ChallengeState>> {
        let Some(challenge) = self.store.read::<ChallengeState>(keys::MATH_CHALLENGE_STATE)? else {
            return Ok(None);
        };
        let session = self.load_session()?;
        if session.active && session.generation == challenge.session_generation {
            Ok(Some(challenge))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{RuleError, StorageError};
    use crate::rules::{Rule, RuleFacility};
    use crate::session::PendingAlarms;
    use crate::storage::MemoryStore;

    const T0: u64 = 1_700_000_000_000;

    struct Harness {
        service: BlockingService,
        store: Arc<MemoryStore>,
        facility: Arc<StoredRuleSet>,
        alarms: Arc<PendingAlarms>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let facility = Arc::new(StoredRuleSet::new(store.clone(), 5000));
        let alarms = Arc::new(PendingAlarms::new());
        let clock = Arc::new(ManualClock::new(T0));
        let service = BlockingService::new(
            store.clone(),
            RuleProgrammer::new(facility.clone(), "siteblock://blocked"),
            alarms.clone(),
            clock.clone(),
        );
        Harness {
            service,
            store,
            facility,
            alarms,
            clock,
        }
    }

    fn request(sites: &[&str], minutes: i64) -> StartRequest {
        StartRequest {
            sites: sites.iter().map(|s| s.to_string()).collect(),
            duration_minutes: minutes,
            profile_id: None,
        }
    }

    fn rule_targets(h: &Harness) -> String {
        h.facility
            .list_active_rules()
            .unwrap()
            .iter()
            .map(|r| format!("{:?}", r.condition))
            .collect::<Vec<_>>()
            .join("\n")
    }

    struct RejectingFacility;

    impl RuleFacility for RejectingFacility {
        fn list_active_rules(&self) -> std::result::Result<Vec<Rule>, RuleError> {
            Ok(Vec::new())
        }

        fn replace_rules(&self, _: &[u32], _: Vec<Rule>) -> std::result::Result<(), RuleError> {
            Err(RuleError::Rejected("quota exceeded".into()))
        }
    }

    #[test]
    fn start_sets_end_timestamp_and_installs_rules() {
        let h = harness();
        let event = h.service.start(request(&["https://www.Reddit.com/r/rust"], 30)).unwrap();

        let Event::BlockingStarted { end_timestamp, rules, .. } = event else {
            panic!("unexpected event {event:?}");
        };
        assert_eq!(end_timestamp, T0 + 1_800_000);
        assert_eq!(rules, RuleStatus::Synced { removed: 0, added: 10 });

        let state = h.service.get_state().unwrap();
        assert!(state.active);
        assert_eq!(state.blocked_sites[0].as_str(), "reddit.com");
        assert_eq!(state.end_timestamp, Some(T0 + 1_800_000));

        let alarm = h.alarms.get(EXPIRY_ALARM).unwrap();
        assert_eq!(alarm.when_ms, T0 + 1_800_000);
        assert_eq!(alarm.generation, state.generation);
    }

    #[test]
    fn start_rejects_bad_input_without_state_change() {
        let h = harness();
        assert!(matches!(
            h.service.start(request(&["a.com"], 0)),
            Err(CoreError::Validation(ValidationError::InvalidDuration(0)))
        ));
        assert!(matches!(
            h.service.start(request(&["a.com"], -5)),
            Err(CoreError::Validation(ValidationError::InvalidDuration(-5)))
        ));
        assert!(matches!(
            h.service.start(request(&["", "https://"], 10)),
            Err(CoreError::Validation(ValidationError::EmptySiteList))
        ));
        assert_eq!(h.service.snapshot().unwrap(), BlockingSession::default());
        assert!(h.facility.list_active_rules().unwrap().is_empty());
    }

    #[test]
    fn check_expiry_after_end_goes_idle() {
        let h = harness();
        h.service.start(request(&["a.com"], 30)).unwrap();

        h.clock.set_ms(T0 + 1_800_001);
        let event = h.service.check_expiry().unwrap().unwrap();
        assert!(matches!(
            event,
            Event::BlockingStopped { reason: StopReason::Expired, was_active: true, .. }
        ));

        let state = h.service.snapshot().unwrap();
        assert!(!state.active);
        assert!(state.blocked_sites.is_empty());
        assert_eq!(state.end_timestamp, None);
        assert!(h.facility.list_active_rules().unwrap().is_empty());
    }

    #[test]
    fn get_state_heals_expired_session() {
        let h = harness();
        h.service.start(request(&["a.com"], 1)).unwrap();
        h.clock.advance_ms(60_000);
        assert!(h.service.snapshot().unwrap().active);
        assert!(!h.service.get_state().unwrap().active);
    }

    #[test]
    fn check_expiry_reasserts_lost_rules_and_alarm() {
        let h = harness();
        h.service.start(request(&["a.com", "b.com"], 30)).unwrap();

        // Simulate a restart that lost both the rules and the timer.
        h.facility.replace_rules(&(1..=20).collect::<Vec<_>>(), Vec::new()).unwrap();
        h.alarms.cancel(EXPIRY_ALARM);

        let event = h.service.check_expiry().unwrap().unwrap();
        assert!(matches!(event, Event::RulesReasserted { .. }));
        assert_eq!(h.facility.list_active_rules().unwrap().len(), 20);
        assert!(h.alarms.get(EXPIRY_ALARM).is_some());
    }

    #[test]
    fn stop_always_leaves_idle_state() {
        let h = harness();
        h.service.start(request(&["a.com"], 30)).unwrap();
        let state = h.service.get_state().unwrap();
        h.service.generate_challenge(Some(Difficulty::Easy)).unwrap();

        h.service.stop(StopReason::Manual).unwrap();
        let idle = h.service.snapshot().unwrap();
        assert_eq!(idle, BlockingSession::idle(state.generation + 1));
        assert!(h.service.challenge_state().unwrap().is_none());
        assert!(h.store.read::<ChallengeState>(keys::MATH_CHALLENGE_STATE).unwrap().is_none());
        assert!(h.facility.list_active_rules().unwrap().is_empty());
        assert!(h.alarms.get(EXPIRY_ALARM).is_none());

        // Idempotent.
        let again = h.service.stop(StopReason::Manual).unwrap();
        assert!(matches!(again, Event::BlockingStopped { was_active: false, .. }));
        assert_eq!(h.service.snapshot().unwrap(), idle);
    }

    #[test]
    fn restart_replaces_rule_set() {
        let h = harness();
        h.service.start(request(&["facebook.com", "twitter.com"], 30)).unwrap();
        h.service.start(request(&["youtube.com"], 10)).unwrap();

        let targets = rule_targets(&h);
        assert!(!targets.contains("facebook"));
        assert!(!targets.contains("twitter"));
        assert!(targets.contains("youtube.com"));
        assert_eq!(h.facility.list_active_rules().unwrap().len(), 10);
    }

    #[test]
    fn stale_alarm_does_not_clear_newer_session() {
        let h = harness();
        h.service.start(request(&["a.com"], 1)).unwrap();
        let stale = h.alarms.get(EXPIRY_ALARM).unwrap();

        h.service.start(request(&["b.com"], 60)).unwrap();
        h.clock.advance_ms(61_000);

        let event = h.service.on_alarm(&stale).unwrap();
        assert!(matches!(event, Event::AlarmIgnored { .. }));
        let state = h.service.snapshot().unwrap();
        assert!(state.active);
        assert_eq!(state.blocked_sites[0].as_str(), "b.com");
    }

    #[test]
    fn current_alarm_stops_session() {
        let h = harness();
        h.service.start(request(&["a.com"], 5)).unwrap();
        h.clock.advance_ms(5 * 60_000);

        let fired = h.alarms.take_due(h.clock.now_ms());
        assert_eq!(fired.len(), 1);
        let event = h.service.on_alarm(&fired[0]).unwrap();
        assert!(matches!(event, Event::BlockingStopped { reason: StopReason::Expired, .. }));
        assert!(!h.service.snapshot().unwrap().active);
    }

    #[test]
    fn early_alarm_is_rearmed() {
        let h = harness();
        h.service.start(request(&["a.com"], 5)).unwrap();
        let alarm = h.alarms.take_due(u64::MAX).remove(0);

        let event = h.service.on_alarm(&alarm).unwrap();
        assert!(matches!(event, Event::RulesReasserted { .. }));
        assert!(h.service.snapshot().unwrap().active);
        assert_eq!(h.alarms.get(EXPIRY_ALARM), Some(alarm));
    }

    #[test]
    fn rule_install_failure_keeps_session_active() {
        let store = Arc::new(MemoryStore::new());
        let service = BlockingService::new(
            store,
            RuleProgrammer::new(Arc::new(RejectingFacility), "siteblock://blocked"),
            Arc::new(PendingAlarms::new()),
            Arc::new(ManualClock::new(T0)),
        );

        let event = service.start(request(&["a.com"], 10)).unwrap();
        assert!(matches!(
            event,
            Event::BlockingStarted { rules: RuleStatus::Failed { .. }, .. }
        ));
        assert!(service.get_state().unwrap().active);
    }

    #[test]
    fn storage_failure_is_reported() {
        let h = harness();
        h.store.set_available(false);
        assert!(matches!(
            h.service.start(request(&["a.com"], 10)),
            Err(CoreError::Storage(StorageError::Unavailable(_)))
        ));
        assert!(matches!(h.service.get_state(), Err(CoreError::Storage(_))));
    }

    #[test]
    fn start_from_profile_copies_sites() {
        let h = harness();
        let profile = h.service.profiles().create("Social", &["instagram.com"]).unwrap();

        h.service
            .start(StartRequest {
                sites: Vec::new(),
                duration_minutes: 15,
                profile_id: Some(profile.id.clone()),
            })
            .unwrap();
        h.service
            .profiles()
            .update(&profile.id, "Social", &["tiktok.com"])
            .unwrap();

        let state = h.service.get_state().unwrap();
        assert_eq!(state.profile_id.as_deref(), Some(profile.id.as_str()));
        assert_eq!(state.blocked_sites[0].as_str(), "instagram.com");
    }

    #[test]
    fn start_from_unknown_profile_fails() {
        let h = harness();
        let err = h
            .service
            .start(StartRequest {
                sites: Vec::new(),
                duration_minutes: 15,
                profile_id: Some("profile_missing".into()),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn medium_challenge_solved_in_order_stops_session() {
        let h = harness();
        h.service.start(request(&["a.com"], 30)).unwrap();
        let challenge = h.service.generate_challenge(Some(Difficulty::Medium)).unwrap();
        assert_eq!(challenge.problems.len(), 5);

        for (i, problem) in challenge.problems.iter().enumerate() {
            let outcome = h.service.submit_answer(&problem.answer.to_string()).unwrap();
            assert!(outcome.correct);
            assert_eq!(outcome.completed, i == 4);
        }

        assert!(!h.service.snapshot().unwrap().active);
        assert!(h.facility.list_active_rules().unwrap().is_empty());
        assert!(matches!(
            h.service.submit_answer("1"),
            Err(CoreError::NoActiveChallenge)
        ));
    }

    #[test]
    fn wrong_then_right_leaves_cursor_at_one() {
        let h = harness();
        h.service.start(request(&["a.com"], 30)).unwrap();
        let challenge = h.service.generate_challenge(Some(Difficulty::Easy)).unwrap();
        let answer = challenge.problems[0].answer;

        assert!(!h.service.submit_answer(&(answer + 1).to_string()).unwrap().correct);
        assert!(h.service.submit_answer(&answer.to_string()).unwrap().correct);
        assert_eq!(h.service.challenge_state().unwrap().unwrap().cursor, 1);
    }

    #[test]
    fn non_numeric_answer_is_validation_error() {
        let h = harness();
        h.service.start(request(&["a.com"], 30)).unwrap();
        h.service.generate_challenge(None).unwrap();
        assert!(matches!(
            h.service.submit_answer("twelve"),
            Err(CoreError::Validation(ValidationError::InvalidAnswer { .. }))
        ));
        assert_eq!(h.service.challenge_state().unwrap().unwrap().cursor, 0);
    }

    #[test]
    fn challenge_requires_active_session() {
        let h = harness();
        assert!(matches!(
            h.service.generate_challenge(None),
            Err(CoreError::NoActiveSession)
        ));
        assert!(matches!(
            h.service.submit_answer("3"),
            Err(CoreError::NoActiveChallenge)
        ));
    }

    #[test]
    fn challenge_dies_with_expired_session() {
        let h = harness();
        h.service.start(request(&["a.com"], 1)).unwrap();
        h.service.generate_challenge(None).unwrap();
        h.clock.advance_ms(60_000);
        assert!(h.service.challenge_state().unwrap().is_none());
    }

    #[test]
    fn challenge_from_previous_session_is_not_reused() {
        let h = harness();
        h.service.start(request(&["a.com"], 30)).unwrap();
        let old = h.service.generate_challenge(None).unwrap();
        // Write the old challenge back after a restart, as a stale record would be.
        h.service.start(request(&["b.com"], 30)).unwrap();
        h.store.write(keys::MATH_CHALLENGE_STATE, &old).unwrap();
        assert!(h.service.challenge_state().unwrap().is_none());
    }

    #[test]
    fn default_difficulty_comes_from_setting() {
        let h = harness();
        assert_eq!(h.service.difficulty().unwrap(), Difficulty::Medium);
        h.service.set_difficulty(Difficulty::Hard).unwrap();
        h.service.start(request(&["a.com"], 30)).unwrap();
        assert_eq!(h.service.generate_challenge(None).unwrap().problems.len(), 7);
    }

    #[test]
    fn initialize_seeds_defaults_once() {
        let h = harness();
        h.service.set_difficulty(Difficulty::Easy).unwrap();
        assert!(h.service.initialize().unwrap().is_none());

        assert_eq!(h.service.difficulty().unwrap(), Difficulty::Easy);
        assert_eq!(h.service.snapshot().unwrap(), BlockingSession::default());
        assert!(h.service.profiles().list().unwrap().is_empty());
        assert!(h.service.notes().list().unwrap().is_empty());
    }

    #[test]
    fn initialize_writes_real_defaults() {
        let h = harness();
        assert!(h.service.initialize().unwrap().is_none());

        let stored = h
            .store
            .get(&[keys::BLOCKING_STATE, keys::MATH_DIFFICULTY, keys::PROFILES])
            .unwrap();
        assert_eq!(stored[keys::MATH_DIFFICULTY], serde_json::json!("medium"));
        assert_eq!(stored[keys::PROFILES], serde_json::json!([]));
        let session = &stored[keys::BLOCKING_STATE];
        assert!(session.is_object(), "{session}");
        assert_eq!(session["active"], serde_json::json!(false));
    }

    #[test]
    fn initialize_clears_session_that_expired_while_down() {
        let h = harness();
        h.service.start(request(&["a.com"], 10)).unwrap();
        h.clock.advance_ms(3_600_000);
        let event = h.service.initialize().unwrap();
        assert!(matches!(event, Some(Event::BlockingStopped { .. })));
        assert!(!h.service.snapshot().unwrap().active);
    }

    #[test]
    fn concurrent_start_and_stop_leave_consistent_state() {
        let h = Arc::new(harness());
        let mut threads = Vec::new();
        for i in 0..8 {
            let h = h.clone();
            threads.push(std::thread::spawn(move || {
                if i % 2 == 0 {
                    h.service.start(request(&["a.com", "b.com"], 30)).unwrap();
                } else {
                    h.service.stop(StopReason::Manual).unwrap();
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }

        let state = h.service.snapshot().unwrap();
        let rules = h.facility.list_active_rules().unwrap();
        if state.active {
            assert_eq!(rules.len(), 20);
            assert_eq!(h.alarms.get(EXPIRY_ALARM).unwrap().generation, state.generation);
        } else {
            assert!(rules.is_empty());
            assert!(h.alarms.get(EXPIRY_ALARM).is_none());
        }
    }
}
