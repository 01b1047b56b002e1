//! Network domain allow/deny policy

use std::collections::HashSet;
use url::Url;

use crate::error::ArbiterResult;

use super::{PolicyDecision, ToolInvocationRequest, ToolPolicy};

/// Gates network-class tools on the target URL's host
///
/// A URL that fails to parse is denied, never an engine error: an input the
/// policy cannot reason about must not slip through on a technicality.
/// Matching is exact host or subdomain suffix.
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    allowed_domains: HashSet<String>,
    blocked_domains: HashSet<String>,
    network_tools: HashSet<String>,
}

impl DomainPolicy {
    pub fn new<I, S>(allowed_domains: I, blocked_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_domains: allowed_domains.into_iter().map(Into::into).collect(),
            blocked_domains: blocked_domains.into_iter().map(Into::into).collect(),
            network_tools: ["web_fetch", "web_search", "http_request"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Override the tool names treated as network clients
    pub fn with_network_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.network_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    fn host_matches(host: &str, domain: &str) -> bool {
        host == domain || host.ends_with(&format!(".{domain}"))
    }
}

impl ToolPolicy for DomainPolicy {
    fn name(&self) -> &str {
        "domain"
    }

    fn applicable_to(&self, tool_name: &str) -> bool {
        self.network_tools.contains(tool_name)
    }

    fn evaluate(&self, request: &ToolInvocationRequest) -> ArbiterResult<PolicyDecision> {
        let Some(raw_url) = request.input_str("url") else {
            return Ok(PolicyDecision::allow());
        };

        let url = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(_) => {
                return Ok(PolicyDecision::deny(format!("malformed URL: {raw_url}")));
            }
        };
        let Some(host) = url.host_str() else {
            return Ok(PolicyDecision::deny(format!("URL has no host: {raw_url}")));
        };

        if self
            .blocked_domains
            .iter()
            .any(|domain| Self::host_matches(host, domain))
        {
            return Ok(PolicyDecision::deny(format!("domain {host} is blocked")));
        }

        if !self.allowed_domains.is_empty()
            && !self
                .allowed_domains
                .iter()
                .any(|domain| Self::host_matches(host, domain))
        {
            return Ok(PolicyDecision::deny(format!(
                "domain {host} is not in the allow-list"
            )));
        }

        Ok(PolicyDecision::allow())
    }
}
