use clap::{Parser, Subcommand};
use siteblock_core::Config;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "siteblock-cli", version, about = "SiteBlock CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Blocking session control
    Block {
        #[command(subcommand)]
        action: commands::block::BlockAction,
    },
    /// Decide whether a navigation would be blocked
    Check {
        /// URL or host to check
        url: String,
    },
    /// Math challenge for ending a session early
    Challenge {
        #[command(subcommand)]
        action: commands::challenge::ChallengeAction,
    },
    /// Saved site-list profiles
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Distraction notes
    Note {
        #[command(subcommand)]
        action: commands::note::NoteAction,
    },
    /// Default challenge difficulty
    Difficulty {
        #[command(subcommand)]
        action: commands::difficulty::DifficultyAction,
    },
    /// Installed redirect rules
    Rules {
        #[command(subcommand)]
        action: commands::rules::RulesAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Dispatch a raw JSON command, e.g. '{"action":"getBlockingState"}'
    Exec {
        json: String,
    },
    /// Stay running and end the session when it expires
    Watch {
        /// Seconds between expiry checks
        #[arg(long, default_value = "30")]
        interval: u64,
        /// Exit once no session is active
        #[arg(long)]
        exit_when_idle: bool,
    },
}

/// Log to stderr so stdout stays JSON. `SITEBLOCK_LOG` overrides the
/// configured filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("SITEBLOCK_LOG").unwrap_or_else(|_| {
        let config = Config::load_or_default();
        EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Block { action } => commands::block::run(action),
        Commands::Check { url } => commands::check::run(&url),
        Commands::Challenge { action } => commands::challenge::run(action),
        Commands::Profile { action } => commands::profile::run(action),
        Commands::Note { action } => commands::note::run(action),
        Commands::Difficulty { action } => commands::difficulty::run(action),
        Commands::Rules { action } => commands::rules::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Exec { json } => commands::exec::run(&json),
        Commands::Watch {
            interval,
            exit_when_idle,
        } => commands::watch::run(interval, exit_when_idle),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
