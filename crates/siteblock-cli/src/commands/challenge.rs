use clap::Subcommand;
use serde_json::{json, Value};
use siteblock_core::{ChallengeState, Difficulty};

use super::{open_service, print_json, CliResult};

#[derive(Subcommand)]
pub enum ChallengeAction {
    /// Start a new challenge, replacing any in progress
    New {
        /// easy, medium or hard (defaults to the saved difficulty)
        #[arg(long, short = 'd')]
        difficulty: Option<String>,
    },
    /// Answer the current problem
    Answer {
        #[arg(allow_hyphen_values = true)]
        answer: String,
    },
    /// Show progress and the current problem
    Show,
}

pub fn run(action: ChallengeAction) -> CliResult {
    let service = open_service()?;

    match action {
        ChallengeAction::New { difficulty } => {
            let difficulty = difficulty
                .map(|d| d.parse::<Difficulty>())
                .transpose()?;
            let challenge = service.generate_challenge(difficulty)?;
            print_json(&progress(&challenge))?;
        }
        ChallengeAction::Answer { answer } => {
            let outcome = service.submit_answer(&answer)?;
            print_json(&outcome)?;
        }
        ChallengeAction::Show => match service.challenge_state()? {
            Some(challenge) => print_json(&progress(&challenge))?,
            None => print_json(&Value::Null)?,
        },
    }
    Ok(())
}

/// Challenge view without the answers.
fn progress(challenge: &ChallengeState) -> Value {
    json!({
        "difficulty": challenge.difficulty,
        "problemIndex": challenge.cursor,
        "problemCount": challenge.problems.len(),
        "currentProblem": challenge.current().map(|p| p.expression.as_str()),
    })
}
