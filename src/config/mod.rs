mod file;

use std::io::Result;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use crate::utils::duration_or_default;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct ServerConfig {
    pub router_id: IpAddr,
    pub local_as: u32,
    pub api_listen: SocketAddr,
    pub fetch_timeout: Duration,
    pub whitelist: Vec<String>,
    pub neighbors: Vec<NeighborConfig>,
    pub feeds: Vec<Arc<FeedSource>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NeighborConfig {
    pub peer_address: IpAddr,
    pub peer_as: u32,
}

/// In-Memory representation of a configured feed
///   Refresh interval is resolved (or defaulted) when the config is loaded
#[derive(Clone, Debug, PartialEq)]
pub struct FeedSource {
    pub url: String,
    pub community: String,
    pub refresh_interval: Duration,
}

impl FeedSource {
    pub fn new(url: &str, community: &str, refresh_interval: Duration) -> Self {
        Self {
            url: url.to_string(),
            community: community.to_string(),
            refresh_interval,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML config file and return a ServerConfig
    pub fn from_file(path: &str) -> Result<Self> {
        let spec = file::ServerConfigSpec::from_file(path)?;
        Ok(Self::from_spec(spec))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let spec = file::ServerConfigSpec::from_str(contents)?;
        Ok(Self::from_spec(spec))
    }

    fn from_spec(spec: file::ServerConfigSpec) -> Self {
        let feeds = spec
            .feeds
            .iter()
            .map(|f| {
                Arc::new(FeedSource {
                    url: f.url.clone(),
                    community: f.community.trim().to_string(),
                    refresh_interval: duration_or_default(
                        &f.refresh_interval,
                        DEFAULT_REFRESH_INTERVAL,
                        "refresh interval",
                    ),
                })
            })
            .collect();
        let neighbors = spec
            .neighbors
            .iter()
            .map(|n| NeighborConfig {
                peer_address: n.peer_address,
                peer_as: n.peer_as,
            })
            .collect();

        Self {
            router_id: spec.router_id,
            local_as: spec.local_as,
            api_listen: spec.api_listen,
            fetch_timeout: duration_or_default(
                &spec.fetch_timeout,
                DEFAULT_FETCH_TIMEOUT,
                "fetch timeout",
            ),
            whitelist: spec.whitelist,
            neighbors,
            feeds,
        }
    }
}
