use clap::Subcommand;
use siteblock_core::RuleFacility;

use super::{open_service, print_json, CliResult};

#[derive(Subcommand)]
pub enum RulesAction {
    /// Print the installed redirect rules as JSON
    List,
}

pub fn run(action: RulesAction) -> CliResult {
    let service = open_service()?;

    match action {
        RulesAction::List => {
            let rules = service.rules().facility().list_active_rules()?;
            print_json(&rules)?;
        }
    }
    Ok(())
}
