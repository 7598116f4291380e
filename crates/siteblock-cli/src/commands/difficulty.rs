use clap::Subcommand;
use siteblock_core::Difficulty;

use super::{open_service, CliResult};

#[derive(Subcommand)]
pub enum DifficultyAction {
    /// Print the saved difficulty
    Get,
    /// Save the difficulty used when none is given
    Set {
        /// easy, medium or hard
        level: String,
    },
}

pub fn run(action: DifficultyAction) -> CliResult {
    let service = open_service()?;

    match action {
        DifficultyAction::Get => println!("{}", service.difficulty()?),
        DifficultyAction::Set { level } => {
            let difficulty: Difficulty = level.parse()?;
            service.set_difficulty(difficulty)?;
            println!("{difficulty}");
        }
    }
    Ok(())
}
