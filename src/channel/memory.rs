//! In-memory ledger.
//!
//! Holds any number of channels, each joined by a set of peers that can be
//! taken offline to simulate unreachable endpoints. Committed state is shared
//! by every peer on a channel.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::types::{ContentAddress, DocumentVersion};

use super::{IndexEntry, Ledger};

#[derive(Debug, Default)]
struct ChannelState {
    /// Peer name to online flag
    peers: BTreeMap<String, bool>,
    content: HashMap<ContentAddress, Vec<u8>>,
    index: HashMap<String, Vec<DocumentVersion>>,
    height: u64,
}

impl ChannelState {
    fn check_reachable(&self, channel: &str, peer: Option<&str>) -> Result<()> {
        match peer {
            Some(peer) => match self.peers.get(peer) {
                Some(true) => Ok(()),
                Some(false) => Err(ClientError::ChannelUnavailable(format!(
                    "peer {} on channel {} is offline",
                    peer, channel
                ))),
                None => Err(ClientError::ChannelUnavailable(format!(
                    "peer {} has not joined channel {}",
                    peer, channel
                ))),
            },
            None if self.peers.values().any(|online| *online) => Ok(()),
            None => Err(ClientError::ChannelUnavailable(format!(
                "no reachable peer on channel {}",
                channel
            ))),
        }
    }
}

/// A ledger held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryLedger {
    channels: RwLock<HashMap<String, ChannelState>>,
}

impl MemoryLedger {
    /// Creates a ledger with no channels
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a channel joined by the given peers, all online
    pub fn with_channel(self, channel: &str, peers: &[&str]) -> Self {
        self.join_channel(channel, peers);
        self
    }

    /// Joins peers to a channel, creating it if needed
    pub fn join_channel(&self, channel: &str, peers: &[&str]) {
        let mut channels = self.channels.write();
        let state = channels.entry(channel.to_string()).or_default();
        for peer in peers {
            state.peers.insert((*peer).to_string(), true);
        }
        debug!(channel, ?peers, "peers joined channel");
    }

    /// Marks a peer online or offline
    pub fn set_peer_online(&self, channel: &str, peer: &str, online: bool) -> Result<()> {
        let mut channels = self.channels.write();
        let state = channels
            .get_mut(channel)
            .ok_or_else(|| unknown_channel(channel))?;
        let flag = state.peers.get_mut(peer).ok_or_else(|| {
            ClientError::ChannelUnavailable(format!("peer {} has not joined channel {}", peer, channel))
        })?;
        *flag = online;
        if !online {
            warn!(channel, peer, "peer taken offline");
        }
        Ok(())
    }
}

fn unknown_channel(channel: &str) -> ClientError {
    ClientError::ChannelUnavailable(format!("unknown channel {}", channel))
}

impl Ledger for MemoryLedger {
    fn peers(&self, channel: &str) -> Result<Vec<String>> {
        let channels = self.channels.read();
        let state = channels.get(channel).ok_or_else(|| unknown_channel(channel))?;
        Ok(state.peers.keys().cloned().collect())
    }

    fn blockchain_time(&self, channel: &str) -> Result<u64> {
        let channels = self.channels.read();
        let state = channels.get(channel).ok_or_else(|| unknown_channel(channel))?;
        state.check_reachable(channel, None)?;
        Ok(state.height)
    }

    fn put_content(&self, channel: &str, address: &ContentAddress, content: &[u8]) -> Result<()> {
        let mut channels = self.channels.write();
        let state = channels
            .get_mut(channel)
            .ok_or_else(|| unknown_channel(channel))?;
        state.check_reachable(channel, None)?;

        match state.content.get(address) {
            Some(existing) if existing.as_slice() == content => Ok(()),
            Some(_) => Err(ClientError::WriteConflict(address.to_string())),
            None => {
                state.content.insert(address.clone(), content.to_vec());
                Ok(())
            }
        }
    }

    fn get_content(
        &self,
        channel: &str,
        peer: Option<&str>,
        address: &ContentAddress,
    ) -> Result<Option<Vec<u8>>> {
        let channels = self.channels.read();
        let state = channels.get(channel).ok_or_else(|| unknown_channel(channel))?;
        state.check_reachable(channel, peer)?;
        Ok(state.content.get(address).cloned())
    }

    fn commit(&self, channel: &str, entries: Vec<IndexEntry>) -> Result<Vec<DocumentVersion>> {
        let mut channels = self.channels.write();
        let state = channels
            .get_mut(channel)
            .ok_or_else(|| unknown_channel(channel))?;
        state.check_reachable(channel, None)?;

        state.height += 1;
        let block = state.height;

        let committed: Vec<DocumentVersion> = entries
            .into_iter()
            .enumerate()
            .map(|(n, entry)| DocumentVersion {
                index_id: entry.index_id,
                operation_type: entry.operation_type,
                address: entry.address,
                anchor_address: entry.anchor_address,
                transaction_time: block,
                transaction_number: n as u64,
            })
            .collect();

        for version in &committed {
            state
                .index
                .entry(version.index_id.clone())
                .or_default()
                .push(version.clone());
        }

        debug!(channel, block, count = committed.len(), "committed block");
        Ok(committed)
    }

    fn query_index(
        &self,
        channel: &str,
        peer: Option<&str>,
        index_id: &str,
    ) -> Result<Vec<DocumentVersion>> {
        let channels = self.channels.read();
        let state = channels.get(channel).ok_or_else(|| unknown_channel(channel))?;
        state.check_reachable(channel, peer)?;
        Ok(state.index.get(index_id).cloned().unwrap_or_default())
    }
}
