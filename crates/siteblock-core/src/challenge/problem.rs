use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Challenge difficulty tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Number of problems a challenge of this tier contains.
    pub fn problem_count(self) -> usize {
        match self {
            Difficulty::Easy => 3,
            Difficulty::Medium => 5,
            Difficulty::Hard => 7,
        }
    }

    fn operators(self) -> &'static [Operator] {
        match self {
            Difficulty::Easy => &[Operator::Add, Operator::Subtract],
            Difficulty::Medium => &[Operator::Add, Operator::Subtract, Operator::Multiply],
            Difficulty::Hard => &[
                Operator::Add,
                Operator::Subtract,
                Operator::Multiply,
                Operator::Divide,
            ],
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        })
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ValidationError::UnknownDifficulty(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
        }
    }
}

/// One arithmetic problem. `answer` is always exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub expression: String,
    pub answer: i64,
}

impl Problem {
    fn new(lhs: i64, op: Operator, rhs: i64) -> Self {
        let answer = match op {
            Operator::Add => lhs + rhs,
            Operator::Subtract => lhs - rhs,
            Operator::Multiply => lhs * rhs,
            Operator::Divide => lhs / rhs,
        };
        Self {
            expression: format!("{lhs} {} {rhs}", op.symbol()),
            answer,
        }
    }
}

/// Generate one problem for `difficulty`.
///
/// - easy: `+`/`-` on 10..=99; subtraction never negative.
/// - medium: `+`/`-` on 100..=999, `*` on 10..=99; subtraction never negative.
/// - hard: `+`/`-` on 1..=100 (may go negative), `*` on 1..=15, `/` built
///   from divisor 1..=10 and quotient 1..=10 so it divides exactly.
pub fn generate_problem<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Problem {
    let op = *difficulty
        .operators()
        .choose(rng)
        .unwrap_or(&Operator::Add);

    match (difficulty, op) {
        (Difficulty::Easy, _) => {
            let (a, b) = ordered(op, rng.gen_range(10..=99), rng.gen_range(10..=99));
            Problem::new(a, op, b)
        }
        (Difficulty::Medium, Operator::Multiply) => {
            Problem::new(rng.gen_range(10..=99), op, rng.gen_range(10..=99))
        }
        (Difficulty::Medium, _) => {
            let (a, b) = ordered(op, rng.gen_range(100..=999), rng.gen_range(100..=999));
            Problem::new(a, op, b)
        }
        (Difficulty::Hard, Operator::Multiply) => {
            Problem::new(rng.gen_range(1..=15), op, rng.gen_range(1..=15))
        }
        (Difficulty::Hard, Operator::Divide) => {
            let divisor = rng.gen_range(1..=10);
            let quotient = rng.gen_range(1..=10);
            Problem::new(divisor * quotient, op, divisor)
        }
        (Difficulty::Hard, _) => Problem::new(rng.gen_range(1..=100), op, rng.gen_range(1..=100)),
    }
}

/// Swap operands of a subtraction so the result is non-negative.
fn ordered(op: Operator, a: i64, b: i64) -> (i64, i64) {
    if op == Operator::Subtract && a < b {
        (b, a)
    } else {
        (a, b)
    }
}
