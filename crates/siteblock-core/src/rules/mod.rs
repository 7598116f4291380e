//! Declarative redirect rules and their installation.
//!
//! Rules are an optimization that lets the host filter navigations before
//! any application code runs. Installation is best-effort, so the
//! [`EnforcementHook`](crate::enforcement::EnforcementHook) stays the
//! authoritative check.

mod facility;
mod programmer;
mod rule;

pub use facility::{RuleFacility, StoredRuleSet};
pub use programmer::{build_rules, RuleProgrammer, RuleSync, RULES_PER_SITE};
pub use rule::{evaluate, ResourceType, Rule, RuleAction, RuleCondition};
