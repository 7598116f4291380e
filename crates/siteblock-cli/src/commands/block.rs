use clap::Subcommand;
use serde_json::json;
use siteblock_core::display::{fetch_state_for_display, format_countdown, DisplayState};
use siteblock_core::{Config, StartRequest, StopReason};

use super::{open_service, print_json, CliResult};

#[derive(Subcommand)]
pub enum BlockAction {
    /// Start blocking the given sites
    Start {
        /// Sites to block (URLs or hosts)
        sites: Vec<String>,
        /// Duration in minutes (defaults to blocking.default_duration_minutes)
        #[arg(long, short = 'm', allow_hyphen_values = true)]
        minutes: Option<i64>,
        /// Block a saved profile's sites
        #[arg(long)]
        profile: Option<String>,
    },
    /// Stop blocking now
    Stop,
    /// Print the session as JSON
    Status,
    /// Print the remaining time as HH:MM:SS, retrying slow reads
    Countdown,
}

pub fn run(action: BlockAction) -> CliResult {
    let service = open_service()?;

    match action {
        BlockAction::Start {
            sites,
            minutes,
            profile,
        } => {
            let duration_minutes = match minutes {
                Some(m) => m,
                None => i64::from(Config::load()?.blocking.default_duration_minutes),
            };
            let event = service.start(StartRequest {
                sites,
                duration_minutes,
                profile_id: profile,
            })?;
            print_json(&event)?;
        }
        BlockAction::Stop => {
            let event = service.stop(StopReason::Manual)?;
            print_json(&event)?;
        }
        BlockAction::Status => {
            let session = service.get_state()?;
            print_json(&session)?;
        }
        BlockAction::Countdown => {
            let policy = Config::load()?.display_policy();
            let runtime = tokio::runtime::Runtime::new()?;
            let read = runtime.block_on(fetch_state_for_display(service, &policy));

            let countdown = match &read.state {
                DisplayState::Blocking { remaining_ms, .. } => Some(format_countdown(*remaining_ms)),
                _ => None,
            };
            print_json(&json!({
                "state": read.state,
                "countdown": countdown,
                "degraded": read.degraded,
            }))?;
        }
    }
    Ok(())
}
