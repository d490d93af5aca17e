//! BGP speaker contract and an in-memory implementation.
//!
//! The feed pipeline only ever talks to a [`Speaker`]: it starts a session,
//! adds peers, announces paths and lists what is currently held.
//! [`LocalRib`] keeps those paths in memory (an Adj-RIB-Out without the wire protocol).

pub mod community;
pub mod families;

pub use community::{Community, CommunityList};
pub use families::Family;

use std::collections::{BTreeMap, HashMap};
use std::error;
use std::fmt;
use std::net::IpAddr;

use async_trait::async_trait;
use bgp_rs::{Identifier, NLRIEncoding, PathAttribute};
use chrono::{DateTime, Utc};
use log::{debug, info, trace};
use tokio::sync::RwLock;

use crate::utils::addr_from_prefix;

#[derive(Debug, PartialEq)]
pub enum SpeakerError {
    /// Session must be started before peers/paths are added
    NotStarted,
    /// Session was already started. [asn, router_id]
    AlreadyStarted(u32, IpAddr),
    /// ASN 0 is reserved
    InvalidAsn(u32),
    /// Peer is already configured. [address]
    DuplicatePeer(IpAddr),
    /// Path was not accepted. [reason]
    Rejected(String),
}

impl fmt::Display for SpeakerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Speaker Error: ")?;
        use SpeakerError::*;
        match self {
            NotStarted => write!(f, "BGP session not started")?,
            AlreadyStarted(asn, id) => {
                write!(f, "BGP session already started (AS {}, id {})", asn, id)?
            }
            InvalidAsn(asn) => write!(f, "Invalid ASN {}", asn)?,
            DuplicatePeer(addr) => write!(f, "Peer {} already exists", addr)?,
            Rejected(r) => write!(f, "Path rejected [{}]", r)?,
        }
        Ok(())
    }
}

impl error::Error for SpeakerError {}

/// A path as held by the speaker
#[derive(Clone, Debug)]
pub struct Path {
    pub family: Family,
    pub nlri: NLRIEncoding,
    pub attributes: Vec<PathAttribute>,
    pub is_withdraw: bool,
    // Time received
    pub timestamp: DateTime<Utc>,
}

impl Path {
    pub fn new(family: Family, nlri: NLRIEncoding, attributes: Vec<PathAttribute>) -> Self {
        Self {
            family,
            nlri,
            attributes,
            is_withdraw: false,
            timestamp: Utc::now(),
        }
    }

    /// First attribute of the given type
    pub fn get(&self, identifier: Identifier) -> Option<&PathAttribute> {
        self.attributes.iter().find(|attr| attr.id() == identifier)
    }

    fn key(&self) -> Option<(IpAddr, u8)> {
        match &self.nlri {
            NLRIEncoding::IP(prefix) => addr_from_prefix(prefix).map(|addr| (addr, prefix.length)),
            _ => None,
        }
    }
}

/// Capabilities required from the BGP collaborator.
///   Must tolerate concurrent calls from every feed task
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn start_session(&self, asn: u32, router_id: IpAddr) -> Result<(), SpeakerError>;
    async fn add_peer(&self, address: IpAddr, asn: u32) -> Result<(), SpeakerError>;
    async fn announce_path(&self, path: Path) -> Result<(), SpeakerError>;
    async fn list_paths(&self, family: Family) -> Result<Vec<Path>, SpeakerError>;
}

#[derive(Debug, Default)]
struct RibState {
    session: Option<(u32, IpAddr)>,
    peers: HashMap<IpAddr, u32>,
    paths: BTreeMap<(IpAddr, u8), Path>,
}

#[derive(Debug, Default)]
pub struct LocalRib {
    inner: RwLock<RibState>,
}

impl LocalRib {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.paths.len()
    }

    pub async fn peers(&self) -> Vec<(IpAddr, u32)> {
        let state = self.inner.read().await;
        state.peers.iter().map(|(addr, asn)| (*addr, *asn)).collect()
    }
}

#[async_trait]
impl Speaker for LocalRib {
    async fn start_session(&self, asn: u32, router_id: IpAddr) -> Result<(), SpeakerError> {
        let mut state = self.inner.write().await;
        if let Some((asn, router_id)) = state.session {
            return Err(SpeakerError::AlreadyStarted(asn, router_id));
        }
        if asn == 0 {
            return Err(SpeakerError::InvalidAsn(asn));
        }
        info!("Starting BGP with router ID {} and AS {}", router_id, asn);
        state.session = Some((asn, router_id));
        Ok(())
    }

    async fn add_peer(&self, address: IpAddr, asn: u32) -> Result<(), SpeakerError> {
        let mut state = self.inner.write().await;
        if state.session.is_none() {
            return Err(SpeakerError::NotStarted);
        }
        if asn == 0 {
            return Err(SpeakerError::InvalidAsn(asn));
        }
        if state.peers.contains_key(&address) {
            return Err(SpeakerError::DuplicatePeer(address));
        }
        info!("Adding neighbor {} (AS {})", address, asn);
        state.peers.insert(address, asn);
        Ok(())
    }

    async fn announce_path(&self, path: Path) -> Result<(), SpeakerError> {
        let key = path
            .key()
            .ok_or_else(|| SpeakerError::Rejected(format!("Unsupported NLRI {:?}", path.nlri)))?;
        if path.family != Family::for_addr(key.0) {
            return Err(SpeakerError::Rejected(format!(
                "NLRI {}/{} does not match family {}",
                key.0, key.1, path.family
            )));
        }
        let mut state = self.inner.write().await;
        if state.session.is_none() {
            return Err(SpeakerError::NotStarted);
        }
        if path.is_withdraw {
            if let Some(existing) = state.paths.get_mut(&key) {
                trace!("Withdrawing {}/{}", key.0, key.1);
                existing.is_withdraw = true;
                existing.timestamp = path.timestamp;
            }
            return Ok(());
        }
        if path.get(Identifier::NEXT_HOP).is_none() {
            return Err(SpeakerError::Rejected(String::from("Missing NEXT_HOP")));
        }
        if state.paths.insert(key, path).is_some() {
            trace!("Replaced path for {}/{}", key.0, key.1);
        } else {
            debug!("Added path for {}/{}", key.0, key.1);
        }
        Ok(())
    }

    async fn list_paths(&self, family: Family) -> Result<Vec<Path>, SpeakerError> {
        let state = self.inner.read().await;
        Ok(state
            .paths
            .values()
            .filter(|p| p.family == family)
            .cloned()
            .collect())
    }
}
