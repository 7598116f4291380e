//! Long-running watcher: owns real alarms, so an active session ends on
//! time even when no other command runs. Events are printed as JSON lines.

use siteblock_core::{BlockingService, Clock, Event, SystemClock, TokioAlarms};
use std::sync::Arc;
use std::time::Duration;

use super::{open_service_with, CliResult};

pub fn run(interval_secs: u64, exit_when_idle: bool) -> CliResult {
    let runtime = tokio::runtime::Runtime::new()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (alarms, mut fired) = TokioAlarms::new(runtime.handle().clone(), clock);
    // `initialize` arms the alarm for a session that is already running.
    let service = open_service_with(Arc::new(alarms))?;

    runtime.block_on(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        tracing::info!(interval_secs, "watching blocking session");

        loop {
            tokio::select! {
                Some(alarm) = fired.recv() => {
                    let service = service.clone();
                    let event = tokio::task::spawn_blocking(move || service.on_alarm(&alarm)).await??;
                    emit(&event)?;
                }
                _ = ticker.tick() => {
                    // Picks up sessions started or stopped by other processes.
                    let worker = service.clone();
                    let event = tokio::task::spawn_blocking(move || worker.check_expiry()).await??;
                    if let Some(event) = event {
                        if !matches!(event, Event::RulesReasserted { .. }) {
                            emit(&event)?;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupted");
                    break;
                }
            }

            if exit_when_idle && !is_active(&service) {
                break;
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

fn emit(event: &Event) -> CliResult {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

fn is_active(service: &BlockingService) -> bool {
    service.snapshot().map(|s| s.active).unwrap_or(false)
}
