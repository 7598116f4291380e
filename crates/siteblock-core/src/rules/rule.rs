use serde::{Deserialize, Serialize};
use url::Url;

/// Kind of request a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    Script,
    Image,
    Xmlhttprequest,
    Other,
}

/// What happens to a matched request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleAction {
    Redirect { url: String },
}

/// Conditions are ANDed; an absent condition always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    /// Matches the listed hosts and all of their subdomains.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_domains: Option<Vec<String>>,
    /// Unanchored, case-insensitive pattern where `*` matches any run of
    /// characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_filter: Option<String>,
    #[serde(default)]
    pub resource_types: Vec<ResourceType>,
}

/// A declarative condition -> action instruction for the request filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: u32,
    pub priority: u32,
    pub condition: RuleCondition,
    pub action: RuleAction,
}

impl Rule {
    pub fn redirect_url(&self) -> &str {
        match &self.action {
            RuleAction::Redirect { url } => url,
        }
    }

    /// Whether this rule applies to a request for `url`.
    pub fn matches(&self, url: &Url, resource_type: ResourceType) -> bool {
        let condition = &self.condition;
        if !condition.resource_types.is_empty() && !condition.resource_types.contains(&resource_type) {
            return false;
        }

        if let Some(domains) = &condition.request_domains {
            let Some(host) = url.host_str() else {
                return false;
            };
            let host = host.to_ascii_lowercase();
            let hit = domains.iter().any(|d| {
                let d = d.to_ascii_lowercase();
                host == d || host.ends_with(&format!(".{d}"))
            });
            if !hit {
                return false;
            }
        }

        if let Some(filter) = &condition.url_filter {
            if !url_filter_matches(filter, url.as_str()) {
                return false;
            }
        }
        true
    }
}

fn url_filter_matches(pattern: &str, url: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let url = url.to_ascii_lowercase();

    let mut pos = 0;
    for piece in pattern.split('*').filter(|p| !p.is_empty()) {
        match url[pos..].find(piece) {
            Some(i) => pos += i + piece.len(),
            None => return false,
        }
    }
    true
}

/// The rule that would handle a request: highest priority wins, ties go to
/// the lowest id.
pub fn evaluate<'a>(rules: &'a [Rule], url: &Url, resource_type: ResourceType) -> Option<&'a Rule> {
    rules
        .iter()
        .filter(|r| r.matches(url, resource_type))
        .max_by(|a, b| a.priority.cmp(&b.priority).then(b.id.cmp(&a.id)))
}
