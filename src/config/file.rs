use std::fs::File;
use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;

struct Defaults {}

impl Defaults {
    fn api_listen() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 8080))
    }

    fn fetch_timeout() -> String {
        String::from("10s")
    }

    fn refresh_interval() -> String {
        String::from("60s")
    }
}

/// Config (toml) representation of a BGP neighbor
#[derive(Clone, Debug, Deserialize)]
pub(super) struct NeighborConfigSpec {
    pub(super) peer_address: IpAddr,
    pub(super) peer_as: u32,
}

/// Config (toml) representation of a blackhole feed
#[derive(Clone, Debug, Deserialize)]
pub(super) struct FeedConfigSpec {
    // Plain text document, one prefix per line
    pub(super) url: String,

    // Attached to every route from this feed ("ASN:VALUE")
    #[serde(default = "String::new")]
    pub(super) community: String,

    // Duration string (E.g. "60s", "5m")
    // Falls back to 60s if it can't be parsed
    #[serde(default = "Defaults::refresh_interval")]
    pub(super) refresh_interval: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ServerConfigSpec {
    // Also used as the next-hop for every announced route
    pub(super) router_id: IpAddr,
    pub(super) local_as: u32,

    // Listening address for the status API
    #[serde(default = "Defaults::api_listen")]
    pub(super) api_listen: SocketAddr,

    // Per-request timeout when fetching feeds
    #[serde(default = "Defaults::fetch_timeout")]
    pub(super) fetch_timeout: String,

    // Prefixes that are never announced, kept as raw strings
    #[serde(default = "Vec::new")]
    pub(super) whitelist: Vec<String>,
    #[serde(default = "Vec::new")]
    pub(super) neighbors: Vec<NeighborConfigSpec>,
    #[serde(default = "Vec::new")]
    pub(super) feeds: Vec<FeedConfigSpec>,
}

impl ServerConfigSpec {
    pub(super) fn from_file(path: &str) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_str(&contents)
    }

    pub(super) fn from_str(contents: &str) -> io::Result<Self> {
        toml::from_str(contents).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_parse_config() {
        let config = ServerConfigSpec::from_file("./demos/config.toml").unwrap();
        assert_eq!(config.router_id, IpAddr::from(Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(config.local_as, 65000);
        assert_eq!(config.neighbors.len(), 2);
        assert_eq!(config.neighbors[0].peer_as, 65001);
        assert_eq!(config.feeds.len(), 2);
        let feed = &config.feeds[0];
        assert_eq!(feed.community, "65535:666");
        assert_eq!(feed.refresh_interval, "5m");
        assert_eq!(config.whitelist, vec!["10.0.0.0/8", "192.168.0.0/16"]);
    }

    #[test]
    fn test_parse_defaults() {
        let config = ServerConfigSpec::from_str(
            r#"
            router_id = "192.0.2.1"
            local_as = 65000

            [[feeds]]
            url = "http://127.0.0.1/feed.txt"
            "#,
        )
        .unwrap();
        assert_eq!(config.api_listen, Defaults::api_listen());
        assert_eq!(config.fetch_timeout, "10s");
        assert!(config.whitelist.is_empty());
        assert!(config.neighbors.is_empty());
        assert_eq!(config.feeds[0].community, "");
        assert_eq!(config.feeds[0].refresh_interval, "60s");
    }

    #[test]
    fn test_parse_invalid() {
        let err = ServerConfigSpec::from_str("router_id = \"not-an-ip\"\nlocal_as = 1").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(ServerConfigSpec::from_str("local_as = 1").is_err());
    }
}
