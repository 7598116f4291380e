pub mod block;
pub mod challenge;
pub mod check;
pub mod config;
pub mod difficulty;
pub mod exec;
pub mod note;
pub mod profile;
pub mod rules;
pub mod watch;

use serde::Serialize;
use siteblock_core::{AlarmScheduler, BlockingService, Config, PendingAlarms, SqliteStore};
use std::sync::Arc;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the on-disk store and wire a service around it.
///
/// One-shot commands record alarms without firing them; an expired session
/// is cleared by the `check_expiry` run on open.
pub fn open_service() -> Result<Arc<BlockingService>, Box<dyn std::error::Error>> {
    open_service_with(Arc::new(PendingAlarms::new()))
}

pub fn open_service_with(
    alarms: Arc<dyn AlarmScheduler>,
) -> Result<Arc<BlockingService>, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = Arc::new(SqliteStore::open()?);
    let service = Arc::new(BlockingService::from_config(store, &config, alarms));
    if let Some(event) = service.initialize()? {
        tracing::debug!(?event, "startup expiry check");
    }
    Ok(service)
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
