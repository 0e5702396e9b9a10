//! Request classification.
//!
//! A [`RouteTable`] is an ordered list of [`RoutingRule`]s. Rules are tried
//! in order and the first match decides the [`Strategy`]. The table always
//! ends with a catch-all network-first rule, so every request gets exactly
//! one strategy.
//!
//! Precedence when built from configuration:
//!
//! 1. non-GET methods → bypass
//! 2. configured bypass rules → bypass
//! 3. manifest entries and cache-first rules → cache-first
//! 4. stale-while-revalidate rules → stale-while-revalidate
//! 5. anything else → network-first

use std::collections::HashSet;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::{CachePolicyConfig, RuleSet};
use crate::manifest::{AssetManifest, origin_and_path};
use crate::request::Request;

/// Caching strategy applied to a request class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Not intercepted; goes straight to the network without touching the cache.
    Bypass,
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Bypass => write!(f, "bypass"),
            Strategy::CacheFirst => write!(f, "cache-first"),
            Strategy::NetworkFirst => write!(f, "network-first"),
            Strategy::StaleWhileRevalidate => write!(f, "stale-while-revalidate"),
        }
    }
}

/// Request predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Anything other than GET.
    NonGetMethod,
    PathPrefix(String),
    ExactPath(String),
    /// Host equal to the suffix or a subdomain of it.
    HostSuffix(String),
    /// Last path segment ends with `.ext` (case-insensitive).
    Extension(String),
    /// `origin + path` is one of the manifest entries.
    ManifestEntry(HashSet<String>),
    Any,
}

impl Matcher {
    pub fn matches(&self, request: &Request) -> bool {
        let url = &request.url;
        match self {
            Matcher::NonGetMethod => !request.is_get(),
            Matcher::PathPrefix(prefix) => url.path().starts_with(prefix.as_str()),
            Matcher::ExactPath(path) => url.path() == path,
            Matcher::HostSuffix(suffix) => url.host_str().is_some_and(|host| host_matches(host, suffix)),
            Matcher::Extension(ext) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .and_then(|segment| segment.rsplit_once('.'))
                .is_some_and(|(_, found)| found.eq_ignore_ascii_case(ext)),
            Matcher::ManifestEntry(paths) => paths.contains(&origin_and_path(url)),
            Matcher::Any => true,
        }
    }
}

fn host_matches(host: &str, suffix: &str) -> bool {
    let suffix = suffix.trim_start_matches('.');
    let host = host.to_ascii_lowercase();
    let suffix = suffix.to_ascii_lowercase();
    host == suffix || host.ends_with(&format!(".{suffix}"))
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::NonGetMethod => write!(f, "method != GET"),
            Matcher::PathPrefix(prefix) => write!(f, "path prefix {prefix}"),
            Matcher::ExactPath(path) => write!(f, "path {path}"),
            Matcher::HostSuffix(suffix) => write!(f, "host *.{suffix}"),
            Matcher::Extension(ext) => write!(f, "extension .{ext}"),
            Matcher::ManifestEntry(paths) => write!(f, "manifest entry ({} assets)", paths.len()),
            Matcher::Any => write!(f, "any"),
        }
    }
}

/// Maps a predicate to a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    pub matcher: Matcher,
    pub strategy: Strategy,
}

impl RoutingRule {
    pub fn new(matcher: Matcher, strategy: Strategy) -> Self {
        Self { matcher, strategy }
    }
}

impl fmt::Display for RoutingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.matcher, self.strategy)
    }
}

/// Ordered, total rule table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RoutingRule>,
}

impl RouteTable {
    /// Build a table from explicit rules, appending the network-first
    /// catch-all.
    pub fn new(mut rules: Vec<RoutingRule>) -> Self {
        rules.push(RoutingRule::new(Matcher::Any, Strategy::NetworkFirst));
        Self { rules }
    }

    /// Build the table a policy describes.
    pub fn from_policy(policy: &CachePolicyConfig, manifest: &AssetManifest) -> Self {
        let mut rules = vec![RoutingRule::new(Matcher::NonGetMethod, Strategy::Bypass)];
        push_rule_set(&mut rules, &policy.bypass, Strategy::Bypass);
        if !manifest.is_empty() {
            rules.push(RoutingRule::new(Matcher::ManifestEntry(manifest.asset_paths()), Strategy::CacheFirst));
        }
        push_rule_set(&mut rules, &policy.cache_first, Strategy::CacheFirst);
        push_rule_set(&mut rules, &policy.stale_while_revalidate, Strategy::StaleWhileRevalidate);
        Self::new(rules)
    }

    /// First rule that matches. Never fails because of the catch-all.
    pub fn classify(&self, request: &Request) -> &RoutingRule {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(request))
            .unwrap_or_else(|| &self.rules[self.rules.len() - 1])
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }
}

fn push_rule_set(rules: &mut Vec<RoutingRule>, set: &RuleSet, strategy: Strategy) {
    let matchers = set
        .exact_paths
        .iter()
        .cloned()
        .map(Matcher::ExactPath)
        .chain(set.path_prefixes.iter().cloned().map(Matcher::PathPrefix))
        .chain(set.host_suffixes.iter().cloned().map(Matcher::HostSuffix))
        .chain(
            set.extensions
                .iter()
                .map(|ext| Matcher::Extension(ext.trim_start_matches('.').to_string())),
        );
    rules.extend(matchers.map(|matcher| RoutingRule::new(matcher, strategy)));
}
