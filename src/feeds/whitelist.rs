use std::net::IpAddr;

use ipnetwork::IpNetwork;
use log::warn;

use crate::utils::parse_cidr;

#[derive(Clone, Debug, PartialEq)]
enum WhitelistEntry {
    Network(String, IpNetwork),
    /// Not a valid CIDR, matches every prefix it is checked against
    Malformed(String),
}

impl WhitelistEntry {
    fn raw(&self) -> &str {
        match self {
            WhitelistEntry::Network(raw, _) => raw,
            WhitelistEntry::Malformed(raw) => raw,
        }
    }
}

/// Operator-defined prefixes that must never be announced
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Whitelist {
    entries: Vec<WhitelistEntry>,
}

/// Parse a candidate the way feed entries are written: CIDR or bare address.
///   IPv4-mapped IPv6 candidates (E.g. "::ffff:10.1.2.3/128") are compared as IPv4
fn parse_candidate(prefix: &str) -> Option<IpNetwork> {
    let network = if prefix.contains('/') {
        parse_cidr(prefix)?
    } else {
        IpNetwork::from(prefix.parse::<IpAddr>().ok()?)
    };
    Some(unmap_ipv4(network))
}

fn unmap_ipv4(network: IpNetwork) -> IpNetwork {
    if let IpNetwork::V6(v6) = network {
        if let Some(v4) = v6.ip().to_ipv4_mapped() {
            if v6.prefix() >= 96 {
                if let Ok(unmapped) = IpNetwork::new(IpAddr::V4(v4), v6.prefix() - 96) {
                    return unmapped;
                }
            }
        }
    }
    network
}

impl Whitelist {
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Self {
        let entries = entries
            .iter()
            .map(|entry| {
                let raw = entry.as_ref().trim().to_string();
                match parse_cidr(&raw) {
                    Some(network) => WhitelistEntry::Network(raw, network),
                    None => {
                        warn!(
                            "Whitelist entry '{}' is not a valid CIDR, prefixes checked against it will be suppressed",
                            raw
                        );
                        WhitelistEntry::Malformed(raw)
                    }
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Should this prefix be kept out of announcements?
    ///   Matches on an identical entry, or an entry at least as broad containing the prefix.
    ///   Fails closed: an unparseable prefix, or reaching a malformed entry, counts as a match
    pub fn contains(&self, prefix: &str) -> bool {
        let candidate = match parse_candidate(prefix) {
            Some(candidate) => candidate,
            None => {
                warn!("Something wrong with prefix '{}', suppressing it", prefix);
                return true;
            }
        };

        for entry in &self.entries {
            if entry.raw() == prefix {
                return true;
            }
            match entry {
                WhitelistEntry::Malformed(raw) => {
                    warn!("Cannot parse whitelist CIDR '{}'", raw);
                    return true;
                }
                WhitelistEntry::Network(_, network) => {
                    if network.contains(candidate.ip()) && network.prefix() <= candidate.prefix() {
                        return true;
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_whitelist() {
        let whitelist = Whitelist::new::<&str>(&[]);
        assert!(whitelist.is_empty());
        assert!(!whitelist.contains("1.2.3.4/32"));
        assert!(!whitelist.contains("2001:db8::/32"));
    }

    #[test]
    fn test_contains_subnets() {
        let whitelist = Whitelist::new(&["10.0.0.0/8"]);
        assert!(whitelist.contains("10.1.2.3"));
        assert!(whitelist.contains("10.1.2.3/32"));
        assert!(whitelist.contains("10.1.0.0/16"));
        assert!(whitelist.contains("10.0.0.0/8"));
        assert!(!whitelist.contains("11.1.2.3"));
        assert!(!whitelist.contains("11.1.2.3/32"));
        // Broader than the whitelist entry
        assert!(!whitelist.contains("10.0.0.0/7"));
        assert!(!whitelist.contains("2001:db8::1/128"));
    }

    #[test]
    fn test_contains_exact_string() {
        let whitelist = Whitelist::new(&["2001:db8::/32", "192.0.2.1/32"]);
        assert!(whitelist.contains("192.0.2.1/32"));
        assert!(whitelist.contains("2001:db8::/32"));
        assert!(whitelist.contains("2001:db8:1::/48"));
        assert!(!whitelist.contains("2001:db9::/32"));
    }

    #[test]
    fn test_contains_ipv4_mapped() {
        let whitelist = Whitelist::new(&["10.0.0.0/8"]);
        assert!(whitelist.contains("::ffff:10.1.2.3/128"));
        assert!(whitelist.contains("::ffff:10.1.2.3"));
        assert!(whitelist.contains("::ffff:10.1.0.0/112"));
        assert!(!whitelist.contains("::ffff:11.1.2.3/128"));
        // Broader than the whitelist entry once unmapped
        assert!(!whitelist.contains("::ffff:0.0.0.0/96"));
    }

    #[test]
    fn test_unparseable_prefix_is_suppressed() {
        let whitelist = Whitelist::new(&["10.0.0.0/8"]);
        assert!(whitelist.contains("not-a-prefix"));
        assert!(whitelist.contains("1.2.3.4/40"));
    }

    #[test]
    fn test_malformed_entry_fails_closed() {
        let whitelist = Whitelist::new(&["10.0.0.0/8", "bogus"]);
        assert_eq!(whitelist.len(), 2);
        assert!(whitelist.contains("10.1.2.3/32"));
        // Reaches the malformed entry, so unrelated prefixes match too
        assert!(whitelist.contains("11.1.2.3/32"));

        let whitelist = Whitelist::new(&["bogus"]);
        assert!(whitelist.contains("bogus"));
        assert!(whitelist.contains("2001:db8::1/128"));
    }
}
