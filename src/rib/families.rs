use std::fmt;
use std::net::IpAddr;

use bgp_rs::{AFI, SAFI};
use serde::{self, Serialize, Serializer};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Family {
    pub afi: AFI,
    pub safi: SAFI,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.afi, self.safi)
    }
}

impl Family {
    pub fn new(afi: AFI, safi: SAFI) -> Self {
        Self { afi, safi }
    }

    pub fn ipv4_unicast() -> Self {
        Self::new(AFI::IPV4, SAFI::Unicast)
    }

    pub fn ipv6_unicast() -> Self {
        Self::new(AFI::IPV6, SAFI::Unicast)
    }

    /// Unicast family for a given address
    pub fn for_addr(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::ipv4_unicast(),
            IpAddr::V6(_) => Self::ipv6_unicast(),
        }
    }

    /// Families listed by the status API
    pub fn unicast() -> Vec<Self> {
        vec![Self::ipv4_unicast(), Self::ipv6_unicast()]
    }
}

impl Serialize for Family {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
