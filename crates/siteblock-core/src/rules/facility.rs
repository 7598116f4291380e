use std::collections::HashSet;
use std::sync::Arc;

use super::Rule;
use crate::error::RuleError;
use crate::storage::{keys, KeyValueStore, KeyValueStoreExt};

/// The host's request-filtering facility.
///
/// Implementations must apply one `replace_rules` call all-or-nothing.
pub trait RuleFacility: Send + Sync {
    fn list_active_rules(&self) -> Result<Vec<Rule>, RuleError>;

    fn replace_rules(&self, remove_ids: &[u32], add_rules: Vec<Rule>) -> Result<(), RuleError>;
}

/// A rule facility that keeps its dynamic rules in the key-value store, so
/// separate processes see the same installed set.
#[derive(Clone)]
pub struct StoredRuleSet {
    store: Arc<dyn KeyValueStore>,
    max_rules: usize,
}

impl StoredRuleSet {
    pub fn new(store: Arc<dyn KeyValueStore>, max_rules: usize) -> Self {
        Self { store, max_rules }
    }
}

impl RuleFacility for StoredRuleSet {
    fn list_active_rules(&self) -> Result<Vec<Rule>, RuleError> {
        Ok(self.store.read(keys::DYNAMIC_RULES)?.unwrap_or_default())
    }

    fn replace_rules(&self, remove_ids: &[u32], add_rules: Vec<Rule>) -> Result<(), RuleError> {
        let mut rules = self.list_active_rules()?;
        rules.retain(|r| !remove_ids.contains(&r.id));

        let mut seen: HashSet<u32> = rules.iter().map(|r| r.id).collect();
        for rule in &add_rules {
            if !seen.insert(rule.id) {
                return Err(RuleError::DuplicateRuleId(rule.id));
            }
        }

        let requested = rules.len() + add_rules.len();
        if requested > self.max_rules {
            return Err(RuleError::TooManyRules {
                requested,
                limit: self.max_rules,
            });
        }

        rules.extend(add_rules);
        self.store.write(keys::DYNAMIC_RULES, &rules)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleAction, RuleCondition};
    use crate::storage::MemoryStore;

    fn rule(id: u32) -> Rule {
        Rule {
            id,
            priority: 1,
            condition: RuleCondition::default(),
            action: RuleAction::Redirect { url: "x".into() },
        }
    }

    #[test]
    fn replace_removes_then_adds() {
        let rules = StoredRuleSet::new(Arc::new(MemoryStore::new()), 10);
        rules.replace_rules(&[], vec![rule(1), rule(2)]).unwrap();
        rules.replace_rules(&[1], vec![rule(3)]).unwrap();

        let ids: Vec<u32> = rules.list_active_rules().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn duplicate_ids_reject_whole_call() {
        let rules = StoredRuleSet::new(Arc::new(MemoryStore::new()), 10);
        rules.replace_rules(&[], vec![rule(1)]).unwrap();

        let err = rules.replace_rules(&[], vec![rule(2), rule(1)]).unwrap_err();
        assert!(matches!(err, RuleError::DuplicateRuleId(1)));
        assert_eq!(rules.list_active_rules().unwrap().len(), 1);
    }

    #[test]
    fn limit_is_enforced() {
        let rules = StoredRuleSet::new(Arc::new(MemoryStore::new()), 2);
        let err = rules
            .replace_rules(&[], vec![rule(1), rule(2), rule(3)])
            .unwrap_err();
        assert!(matches!(err, RuleError::TooManyRules { requested: 3, limit: 2 }));
        assert!(rules.list_active_rules().unwrap().is_empty());
    }

    #[test]
    fn storage_failure_surfaces_as_rule_error() {
        let store = Arc::new(MemoryStore::new());
        let rules = StoredRuleSet::new(store.clone(), 10);
        store.set_available(false);
        assert!(matches!(rules.list_active_rules(), Err(RuleError::Storage(_))));
    }
}
