use serde_json::json;
use siteblock_core::rules::{evaluate, ResourceType};
use siteblock_core::{EnforcementHook, RuleFacility};
use url::Url;

use super::{open_service, print_json, CliResult};

/// Report the enforcement decision for `target`, and which installed rule
/// (if any) would have redirected it first.
pub fn run(target: &str) -> CliResult {
    let service = open_service()?;
    let hook = EnforcementHook::new(service.clone());
    let decision = hook.on_navigation(target);

    let rule_id = match Url::parse(target) {
        Ok(url) => {
            let rules = service.rules().facility().list_active_rules()?;
            evaluate(&rules, &url, ResourceType::MainFrame).map(|rule| rule.id)
        }
        Err(_) => None,
    };

    print_json(&json!({
        "target": target,
        "decision": decision,
        "ruleId": rule_id,
    }))
}
