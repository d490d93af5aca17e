//! Conversion between feed prefixes and speaker paths.
//!
//! Encoding builds the NLRI & path attributes for a blackhole announcement,
//! decoding turns a speaker path back into a display-friendly [`Route`].

use std::convert::TryFrom;
use std::error;
use std::fmt;
use std::net::IpAddr;

use bgp_rs::{NLRIEncoding, Origin, PathAttribute, Segment, AFI};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::rib::{Community, Family, Path};
use crate::utils::{addr_from_prefix, format_time_as_elapsed, parse_cidr, prefix_from_network};

#[derive(Debug, PartialEq)]
pub enum EncodeError {
    /// Not an IP address or CIDR prefix. [prefix]
    InvalidPrefix(String),
    /// Router ID is unspecified, no next-hop to announce with
    NoNextHop,
    /// Community is not "ASN:VALUE" or packs to 0. [community]
    InvalidCommunity(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use EncodeError::*;
        match self {
            InvalidPrefix(p) => write!(f, "Invalid prefix '{}'", p),
            NoNextHop => write!(f, "Invalid next hop address"),
            InvalidCommunity(c) => write!(f, "Invalid community format '{}'", c),
        }
    }
}

impl error::Error for EncodeError {}

/// Read model of a path held by the speaker
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Route {
    /// Prefix with explicit length (E.g. "5.6.7.0/24")
    pub prefix: String,
    pub prefix_len: u8,
    /// Empty if the path has no next-hop
    pub next_hop: String,
    pub as_path: Vec<u32>,
    pub communities: Vec<u32>,
    /// Unix timestamp the speaker stored the path at
    pub received_at: i64,
    pub age: String,
}

impl Route {
    /// Was this route originated locally (next-hop is our router ID)
    pub fn is_outbound(&self, router_id: IpAddr) -> bool {
        self.next_hop == router_id.to_string()
    }
}

/// Parse a CIDR prefix, or a bare address as a host prefix
fn parse_network(prefix: &str) -> Result<IpNetwork, EncodeError> {
    let invalid = || EncodeError::InvalidPrefix(prefix.to_string());
    if prefix.contains('/') {
        parse_cidr(prefix).ok_or_else(invalid)
    } else {
        prefix
            .parse::<IpAddr>()
            .map(IpNetwork::from)
            .map_err(|_| invalid())
    }
}

#[derive(Clone, Debug)]
pub struct RouteEncoder {
    router_id: IpAddr,
}

impl RouteEncoder {
    pub fn new(router_id: IpAddr) -> Self {
        Self { router_id }
    }

    /// Build the path to announce for `prefix`, tagged with `community` if given
    pub fn encode(&self, prefix: &str, community: Option<&str>) -> Result<Path, EncodeError> {
        let network = parse_network(prefix)?;
        if self.router_id.is_unspecified() {
            return Err(EncodeError::NoNextHop);
        }
        let mut attributes = vec![
            PathAttribute::ORIGIN(Origin::IGP),
            PathAttribute::NEXT_HOP(self.router_id),
        ];
        if let Some(community) = community.filter(|c| !c.is_empty()) {
            let community = Community::try_from(community)
                .map_err(|_| EncodeError::InvalidCommunity(community.to_string()))?;
            attributes.push(PathAttribute::COMMUNITY(vec![community.value()]));
        }
        Ok(Path::new(
            Family::for_addr(network.ip()),
            NLRIEncoding::IP(prefix_from_network(&network)),
            attributes,
        ))
    }

    /// Convert a speaker path to a Route
    ///   Missing attributes leave their field empty
    pub fn decode(path: &Path) -> Route {
        let mut route = Route {
            received_at: path.timestamp.timestamp(),
            age: format_time_as_elapsed(path.timestamp),
            ..Default::default()
        };
        if let NLRIEncoding::IP(prefix) = &path.nlri {
            if let Some(addr) = addr_from_prefix(prefix) {
                route.prefix = format!("{}/{}", addr, prefix.length);
                route.prefix_len = prefix.length;
            }
        }

        let mut next_hop: Option<IpAddr> = None;
        let mut mp_next_hop: Option<IpAddr> = None;
        let mut as_path: Option<Vec<u32>> = None;
        let mut communities: Option<Vec<u32>> = None;
        for attr in &path.attributes {
            match attr {
                PathAttribute::NEXT_HOP(addr) if next_hop.is_none() => next_hop = Some(*addr),
                PathAttribute::MP_REACH_NLRI(nlri) if mp_next_hop.is_none() => {
                    if nlri.afi == AFI::IPV6 && nlri.next_hop.len() >= 16 {
                        let mut buffer = [0u8; 16];
                        buffer.clone_from_slice(&nlri.next_hop[..16]);
                        mp_next_hop = Some(IpAddr::from(buffer));
                    }
                }
                PathAttribute::AS_PATH(path) if as_path.is_none() => {
                    as_path = Some(match path.segments.first() {
                        Some(Segment::AS_SEQUENCE(asns)) | Some(Segment::AS_SET(asns)) => {
                            asns.clone()
                        }
                        None => vec![],
                    });
                }
                PathAttribute::COMMUNITY(values) if communities.is_none() => {
                    communities = Some(values.clone())
                }
                _ => (),
            }
        }
        route.next_hop = next_hop
            .or(mp_next_hop)
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        route.as_path = as_path.unwrap_or_default();
        route.communities = communities.unwrap_or_default();
        route
    }
}
