//! Per-navigation enforcement.
//!
//! Consulted on every top-level navigation whether or not the declarative
//! rules installed. Reads a lock-free snapshot of the session, so a decision
//! may be one transition stale.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::domain::{normalize, Domain};
use crate::rules::ResourceType;
use crate::session::BlockingService;

/// What to do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum NavigationDecision {
    Allow,
    Redirect { url: String, matched_site: Domain },
}

impl NavigationDecision {
    pub fn is_redirect(&self) -> bool {
        matches!(self, NavigationDecision::Redirect { .. })
    }
}

pub struct EnforcementHook {
    service: Arc<BlockingService>,
}

impl EnforcementHook {
    pub fn new(service: Arc<BlockingService>) -> Self {
        Self { service }
    }

    /// Decide a top-level navigation to `target`.
    ///
    /// `target` may be a full URL or a bare host. An expired session is
    /// treated as inactive without being cleared here. If the session cannot
    /// be read the navigation is allowed and a warning logged.
    pub fn on_navigation(&self, target: &str) -> NavigationDecision {
        let session = match self.service.snapshot() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "session unreadable, allowing navigation");
                return NavigationDecision::Allow;
            }
        };
        if !session.is_live(self.service.clock().now_ms()) {
            return NavigationDecision::Allow;
        }

        let host = hostname(target);
        if host.is_empty() {
            return NavigationDecision::Allow;
        }

        match session.blocked_sites.iter().find(|site| site.matches_host(&host)) {
            Some(site) => {
                tracing::debug!(%host, site = %site.as_str(), "navigation redirected");
                NavigationDecision::Redirect {
                    url: self.service.rules().redirect_url().to_string(),
                    matched_site: site.clone(),
                }
            }
            None => NavigationDecision::Allow,
        }
    }

    /// Like [`on_navigation`](Self::on_navigation), but subresource loads
    /// are always allowed.
    pub fn on_request(&self, target: &str, resource_type: ResourceType) -> NavigationDecision {
        if resource_type != ResourceType::MainFrame {
            return NavigationDecision::Allow;
        }
        self.on_navigation(target)
    }
}

/// Host part of `target`, lowercased and without a trailing `.`.
///
/// Only `scheme://` targets are parsed as URLs: `host:port` would otherwise
/// parse with the host as the scheme. Everything else goes through domain
/// normalization, which also drops the port.
fn hostname(target: &str) -> String {
    let target = target.trim();
    let host = match target.contains("://").then(|| Url::parse(target)) {
        Some(Ok(url)) => url.host_str().map(str::to_ascii_lowercase).unwrap_or_default(),
        _ => normalize(target),
    };
    match host.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}
