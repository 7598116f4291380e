//! Saved site-list profiles.

use clap::Subcommand;

use super::{open_service, print_json, CliResult};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// List all profiles
    List,
    /// Show one profile
    Show {
        id: String,
    },
    /// Create a profile
    Create {
        /// Display name
        name: String,
        /// Sites in the profile
        #[arg(required = true)]
        sites: Vec<String>,
    },
    /// Replace a profile's name and sites
    Update {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(required = true)]
        sites: Vec<String>,
    },
    /// Delete a profile
    Delete {
        id: String,
    },
}

pub fn run(action: ProfileAction) -> CliResult {
    let profiles = open_service()?.profiles();

    match action {
        ProfileAction::List => print_json(&profiles.list()?)?,
        ProfileAction::Show { id } => match profiles.get(&id)? {
            Some(profile) => print_json(&profile)?,
            None => return Err(format!("profile not found: {id}").into()),
        },
        ProfileAction::Create { name, sites } => print_json(&profiles.create(&name, sites.as_slice())?)?,
        ProfileAction::Update { id, name, sites } => {
            print_json(&profiles.update(&id, &name, sites.as_slice())?)?
        }
        ProfileAction::Delete { id } => {
            if !profiles.delete(&id)? {
                return Err(format!("profile not found: {id}").into());
            }
            println!("deleted {id}");
        }
    }
    Ok(())
}
