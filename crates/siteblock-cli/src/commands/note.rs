use clap::Subcommand;

use super::{open_service, print_json, CliResult};

#[derive(Subcommand)]
pub enum NoteAction {
    /// Record what distracted you
    Add {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// List notes, newest first
    List,
    /// Delete all notes
    Clear,
}

pub fn run(action: NoteAction) -> CliResult {
    let notes = open_service()?.notes();

    match action {
        NoteAction::Add { text } => print_json(&notes.add(&text.join(" "))?)?,
        NoteAction::List => print_json(&notes.list()?)?,
        NoteAction::Clear => {
            notes.clear()?;
            println!("notes cleared");
        }
    }
    Ok(())
}
