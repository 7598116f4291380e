use siteblock_core::dispatch_json;

use super::{open_service, print_json, CliResult};

/// Dispatch one JSON command and print its response. A failed response
/// exits with status 1.
pub fn run(json: &str) -> CliResult {
    let service = open_service()?;
    let response = dispatch_json(&service, json);
    print_json(&response)?;
    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
