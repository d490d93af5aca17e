use std::collections::HashSet;
use std::net::IpAddr;

use log::{debug, trace};

use crate::utils::parse_cidr;

/// Normalize a single feed entry to a prefix with an explicit length.
///   CIDR prefixes are kept as written, bare addresses get /32 or /128
pub fn normalize_prefix(entry: &str) -> Option<String> {
    if entry.contains('/') {
        return parse_cidr(entry).map(|_| entry.to_string());
    }
    match entry.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => Some(format!("{}/32", entry)),
        Ok(IpAddr::V6(_)) => Some(format!("{}/128", entry)),
        Err(_) => None,
    }
}

/// Parse a feed document into unique normalized prefixes, in first-seen order.
///   Blank lines and `#` comments are skipped, unparseable lines are dropped
pub fn parse_feed(body: &str) -> Vec<String> {
    let mut prefixes: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let normalized = match normalize_prefix(line) {
            Some(normalized) => normalized,
            None => {
                debug!("Skipping unparseable feed entry '{}'", line);
                continue;
            }
        };
        if seen.insert(normalized.clone()) {
            prefixes.push(normalized);
        } else {
            trace!("Found duplicated prefix: {}", normalized);
        }
    }
    prefixes
}
