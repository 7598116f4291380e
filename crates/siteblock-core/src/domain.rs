//! Site normalization and hostname matching.
//!
//! Every site the user types goes through [`normalize`] once, and all rule
//! generation and matching afterwards works on the canonical form held by
//! [`Domain`].

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Host;

const WWW: &str = "www.";

/// A site in canonical form: lowercase ASCII (punycode for internationalized
/// names), no scheme, no leading `www.`, no port or trailing `.`, nothing
/// from the first `/`, `?` or `#` onwards.
///
/// Bare words without a dot (e.g. `localhost`) are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Normalize `raw`, returning `None` when nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `www.` variant used by rule generation.
    pub fn www(&self) -> String {
        format!("{WWW}{}", self.0)
    }

    /// True if `hostname` is this domain, its `www.` form or a subdomain.
    pub fn matches_host(&self, hostname: &str) -> bool {
        matches(hostname, self)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize a user-entered site string.
///
/// Internationalized names are converted to their ASCII (punycode) form so
/// they compare equal to hosts parsed out of URLs. A trailing `:port` and a
/// trailing `.` are dropped.
///
/// `normalize(normalize(x)) == normalize(x)` for every input.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let without_scheme = strip_scheme(&lowered);

    let end = without_scheme
        .find(['/', '?', '#'])
        .unwrap_or(without_scheme.len());
    let host = canonical_host(&without_scheme[..end]);
    if host.is_ascii() {
        return host.to_string();
    }

    match Host::parse(host) {
        Ok(Host::Domain(ascii)) => canonical_host(&ascii).to_string(),
        _ => host.to_string(),
    }
}

/// Trim, strip leading `www.`, a trailing `.` and a `:port` until nothing
/// changes.
fn canonical_host(mut host: &str) -> &str {
    loop {
        let next = strip_port(host.trim());
        let next = next.strip_prefix(WWW).unwrap_or(next);
        let next = next.strip_suffix('.').unwrap_or(next);
        if next.len() == host.len() {
            return host;
        }
        host = next;
    }
}

fn strip_port(host: &str) -> &str {
    match host.split_once(':') {
        Some((name, port)) if !host.starts_with('[') && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

/// Normalize a list of raw sites, dropping entries that normalize to nothing.
pub fn normalize_all<I, S>(raw: I) -> Vec<Domain>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|s| Domain::parse(s.as_ref()))
        .collect()
}

/// True iff `hostname` (minus a trailing `.` and a leading `www.`) equals
/// `site` or ends with `"." + site`.
pub fn matches(hostname: &str, site: &Domain) -> bool {
    let host = hostname.trim().to_lowercase();
    let host = host.strip_suffix('.').unwrap_or(&host);
    let host = host.strip_prefix(WWW).unwrap_or(host);
    let site = site.as_str();

    if host == site {
        return true;
    }
    host.len() > site.len()
        && host.ends_with(site)
        && host.as_bytes()[host.len() - site.len() - 1] == b'.'
}

/// True if `hostname` matches any of `sites`.
pub fn matches_any(hostname: &str, sites: &[Domain]) -> bool {
    sites.iter().any(|site| matches(hostname, site))
}

/// Strip a `scheme://` prefix (RFC 3986 scheme characters).
fn strip_scheme(s: &str) -> &str {
    if let Some(idx) = s.find("://") {
        let scheme = &s[..idx];
        let mut chars = scheme.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'));
        if valid {
            return &s[idx + 3..];
        }
    }
    s
}
