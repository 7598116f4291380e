//! Arithmetic challenges gating early unblock.
//!
//! A challenge is a fixed sequence of problems sized by [`Difficulty`].
//! Answering every problem in order ends the blocking session; wrong answers
//! can be retried indefinitely.

mod engine;
mod problem;

pub use engine::{ChallengeState, SubmitOutcome};
pub use problem::{generate_problem, Difficulty, Problem};
