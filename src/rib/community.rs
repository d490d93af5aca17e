use std::convert::TryFrom;
use std::fmt;
use std::io;

use serde::Serialize;

use crate::utils::u32_to_dotted;

/// Standard (RFC 1997) community, packed as `(ASN << 16) | VALUE`
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Community(pub u32);

impl Community {
    pub fn new(asn: u16, value: u16) -> Self {
        Community((u32::from(asn) << 16) | u32::from(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u32_to_dotted(self.0, ':'))
    }
}

fn invalid(value: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("Invalid community '{}'", value),
    )
}

impl TryFrom<&str> for Community {
    type Error = io::Error;

    /// Parse an "ASN:VALUE" community, both halves must fit in 16 bits.
    /// "0:0" packs to 0 and is rejected along with anything unparseable
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let chunks: Vec<_> = value.split(':').collect();
        if chunks.len() != 2 {
            return Err(invalid(value));
        }
        let asn = chunks[0].parse::<u16>().map_err(|_| invalid(value))?;
        let val = chunks[1].parse::<u16>().map_err(|_| invalid(value))?;
        let community = Community::new(asn, val);
        if community.0 == 0 {
            return Err(invalid(value));
        }
        Ok(community)
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct CommunityList(pub Vec<Community>);

impl From<&[u32]> for CommunityList {
    fn from(values: &[u32]) -> Self {
        CommunityList(values.iter().map(|v| Community(*v)).collect())
    }
}

impl fmt::Display for CommunityList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let communities = self
            .0
            .iter()
            .map(std::string::ToString::to_string)
            .collect::<Vec<String>>()
            .join(" ");
        write!(f, "{}", communities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_community() {
        assert_eq!(Community::try_from("1:100").unwrap().value(), 65636);
        assert_eq!(
            Community::try_from("65535:666").unwrap().value(),
            (65535 << 16) | 666
        );
        assert_eq!(Community::try_from("0:100").unwrap().value(), 100);
        assert_eq!(Community::try_from("65535:65535").unwrap().value(), u32::MAX);
    }

    #[test]
    fn test_parse_invalid_community() {
        for value in &[
            "65000", "0:0", "1:2:3", "65536:1", "1:65536", "-1:100", "a:b", ":100", "1:", "",
            " 1:100",
        ] {
            assert!(Community::try_from(*value).is_err(), "{} should fail", value);
        }
    }

    #[test]
    fn test_community_list_display() {
        let list = CommunityList::from(&[65636u32, 100][..]);
        assert_eq!(list.to_string(), "1:100 0:100");
        assert_eq!(list.0, vec![Community::new(1, 100), Community::new(0, 100)]);
    }
}
