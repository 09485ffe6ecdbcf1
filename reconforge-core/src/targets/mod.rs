//! Target parsing and structural validation

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::{Error, Result};

/// Structural classification of a reconnaissance target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Domain,
    Ip,
    Url,
}

/// A validated reconnaissance target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Input exactly as the caller supplied it
    pub raw: String,
    pub kind: TargetKind,
    /// Hostname or address portion, without scheme, port, or path
    host: String,
}

impl Target {
    /// Parse and validate a target string. Accepts bare domains, IPv4/IPv6
    /// literals, and http(s) URLs; everything else is rejected before any
    /// registry or subprocess work happens.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidTarget("empty target".to_string()));
        }

        if let Ok(addr) = input.parse::<IpAddr>() {
            return Ok(Self {
                raw: input.to_string(),
                kind: TargetKind::Ip,
                host: addr.to_string(),
            });
        }

        if input.starts_with("http://") || input.starts_with("https://") {
            let host = url_host(input)
                .ok_or_else(|| Error::InvalidTarget(format!("malformed URL: {input}")))?;
            if host.parse::<IpAddr>().is_err() && !is_valid_domain(&host) {
                return Err(Error::InvalidTarget(format!("bad URL host: {input}")));
            }
            return Ok(Self {
                raw: input.to_string(),
                kind: TargetKind::Url,
                host,
            });
        }

        if is_valid_domain(input) {
            return Ok(Self {
                raw: input.to_string(),
                kind: TargetKind::Domain,
                host: input.to_lowercase(),
            });
        }

        Err(Error::InvalidTarget(input.to_string()))
    }

    /// Hostname or address portion of the target.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The target as a URL. URLs pass through untouched; domains and IPs get
    /// an https scheme, which is what URL-oriented tools expect as input.
    pub fn as_url(&self) -> String {
        match self.kind {
            TargetKind::Url => self.raw.clone(),
            TargetKind::Domain | TargetKind::Ip => format!("https://{}", self.host),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Extract the host portion of an http(s) URL, dropping port and path.
fn url_host(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let authority = rest.split(['/', '?', '#']).next()?;
    if authority.is_empty() {
        return None;
    }
    // Bracketed IPv6 literals keep their brackets off the host
    if let Some(v6) = authority.strip_prefix('[') {
        return v6.split(']').next().map(|h| h.to_string());
    }
    let host = authority.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// RFC 1035-shaped check: dotted labels of alphanumerics and inner hyphens,
/// with an alphabetic top-level label.
fn is_valid_domain(input: &str) -> bool {
    if input.len() > 253 || !input.contains('.') {
        return false;
    }
    let labels: Vec<&str> = input.split('.').collect();
    for label in &labels {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }
    labels
        .last()
        .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_alphabetic()))
}
