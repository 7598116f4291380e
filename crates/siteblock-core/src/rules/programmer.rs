//! Turns the blocked-site list into redirect rules and installs them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ResourceType, Rule, RuleAction, RuleCondition, RuleFacility};
use crate::domain::Domain;
use crate::error::RuleError;

/// Rule ids for site `i` are `i * RULES_PER_SITE + 1 ..= i * RULES_PER_SITE + RULES_PER_SITE`.
pub const RULES_PER_SITE: u32 = 10;

/// Outcome of one install pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSync {
    pub removed: usize,
    pub added: usize,
}

/// Which host form and URL shape a generated rule targets.
enum Target {
    Domains,
    Filter { scheme: &'static str, wildcard: bool },
}

/// (target, use www form, priority), in id-offset order 1..=10.
const LAYOUT: [(Target, bool, u32); RULES_PER_SITE as usize] = [
    (Target::Domains, false, 10),
    (Target::Domains, true, 10),
    (Target::Filter { scheme: "https", wildcard: true }, false, 9),
    (Target::Filter { scheme: "https", wildcard: true }, true, 9),
    (Target::Filter { scheme: "https", wildcard: false }, false, 8),
    (Target::Filter { scheme: "https", wildcard: false }, true, 8),
    (Target::Filter { scheme: "http", wildcard: true }, false, 7),
    (Target::Filter { scheme: "http", wildcard: true }, true, 7),
    (Target::Filter { scheme: "http", wildcard: false }, false, 6),
    (Target::Filter { scheme: "http", wildcard: false }, true, 6),
];

/// Build the full rule set for `sites`.
///
/// Each site gets rules for the bare and `www.` host, under both schemes,
/// with and without a path wildcard. Only top-level navigations are
/// targeted. Ids depend only on list position, so the same list always
/// yields the same ids.
pub fn build_rules(sites: &[Domain], redirect_url: &str) -> Vec<Rule> {
    let mut rules = Vec::with_capacity(sites.len() * RULES_PER_SITE as usize);
    for (index, site) in sites.iter().enumerate() {
        let base = index as u32 * RULES_PER_SITE;
        for (offset, (target, www, priority)) in LAYOUT.iter().enumerate() {
            let host = if *www { site.www() } else { site.to_string() };
            let condition = match target {
                Target::Domains => RuleCondition {
                    request_domains: Some(vec![host]),
                    url_filter: None,
                    resource_types: vec![ResourceType::MainFrame],
                },
                Target::Filter { scheme, wildcard } => RuleCondition {
                    request_domains: None,
                    url_filter: Some(if *wildcard {
                        format!("{scheme}://{host}/*")
                    } else {
                        format!("{scheme}://{host}")
                    }),
                    resource_types: vec![ResourceType::MainFrame],
                },
            };
            rules.push(Rule {
                id: base + offset as u32 + 1,
                priority: *priority,
                condition,
                action: RuleAction::Redirect {
                    url: redirect_url.to_string(),
                },
            });
        }
    }
    rules
}

/// Installs rule sets against a [`RuleFacility`].
#[derive(Clone)]
pub struct RuleProgrammer {
    facility: Arc<dyn RuleFacility>,
    redirect_url: String,
}

impl RuleProgrammer {
    pub fn new(facility: Arc<dyn RuleFacility>, redirect_url: impl Into<String>) -> Self {
        Self {
            facility,
            redirect_url: redirect_url.into(),
        }
    }

    pub fn facility(&self) -> &Arc<dyn RuleFacility> {
        &self.facility
    }

    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// Replace every installed dynamic rule with the rules for `sites`.
    ///
    /// Remove-then-add: between the two calls no rules are active. An empty
    /// list just clears. Not transactional: if the add fails the removal
    /// stands.
    pub fn install(&self, sites: &[Domain]) -> Result<RuleSync, RuleError> {
        let existing = self.facility.list_active_rules()?;
        let remove_ids: Vec<u32> = existing.iter().map(|r| r.id).collect();
        if !remove_ids.is_empty() {
            self.facility.replace_rules(&remove_ids, Vec::new())?;
        }

        let rules = build_rules(sites, &self.redirect_url);
        let added = rules.len();
        if added > 0 {
            self.facility.replace_rules(&[], rules)?;
        }

        tracing::debug!(removed = remove_ids.len(), added, "dynamic rules replaced");
        Ok(RuleSync {
            removed: remove_ids.len(),
            added,
        })
    }
}
