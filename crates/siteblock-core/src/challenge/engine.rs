use rand::Rng;
use serde::{Deserialize, Serialize};

use super::problem::{generate_problem, Difficulty, Problem};
use crate::error::ValidationError;

/// An in-progress challenge: a fixed problem sequence and a cursor.
///
/// Bound to the session generation it was created under; a challenge whose
/// generation no longer matches the session is dead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeState {
    pub problems: Vec<Problem>,
    /// Index of the problem being answered; `problems.len()` once done.
    pub cursor: usize,
    pub difficulty: Difficulty,
    pub session_generation: u64,
}

/// Result of grading one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub correct: bool,
    pub completed: bool,
    pub problem_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_problem: Option<Problem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ChallengeState {
    /// Generate `difficulty.problem_count()` independent problems.
    pub fn generate<R: Rng + ?Sized>(difficulty: Difficulty, session_generation: u64, rng: &mut R) -> Self {
        let problems = (0..difficulty.problem_count())
            .map(|_| generate_problem(difficulty, rng))
            .collect();
        Self {
            problems,
            cursor: 0,
            difficulty,
            session_generation,
        }
    }

    pub fn current(&self) -> Option<&Problem> {
        self.problems.get(self.cursor)
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.problems.len()
    }

    /// Grade `raw` against the current problem.
    ///
    /// A correct answer advances the cursor; a wrong one leaves it where it
    /// is. Non-numeric input is a validation error and changes nothing.
    pub fn submit(&mut self, raw: &str) -> Result<SubmitOutcome, ValidationError> {
        let answer: i64 = raw
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidAnswer { raw: raw.to_string() })?;

        let Some(problem) = self.current().cloned() else {
            return Ok(SubmitOutcome {
                correct: false,
                completed: true,
                problem_index: self.cursor,
                current_problem: None,
                correct_answer: None,
                message: None,
            });
        };

        if answer != problem.answer {
            return Ok(SubmitOutcome {
                correct: false,
                completed: false,
                problem_index: self.cursor,
                correct_answer: Some(problem.answer),
                current_problem: Some(problem),
                message: None,
            });
        }

        self.cursor += 1;
        if self.is_complete() {
            Ok(SubmitOutcome {
                correct: true,
                completed: true,
                problem_index: self.cursor,
                current_problem: None,
                correct_answer: None,
                message: Some("All problems solved! Blocking cleared.".into()),
            })
        } else {
            Ok(SubmitOutcome {
                correct: true,
                completed: false,
                problem_index: self.cursor,
                current_problem: self.current().cloned(),
                correct_answer: None,
                message: None,
            })
        }
    }
}
