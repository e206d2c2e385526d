//! Ledger channels: content-addressed storage and the document index.
//!
//! A channel carries two stores. The content-addressed store (DCAS) holds
//! immutable bytes keyed by their content address. The document index holds,
//! per index ID, the ordered list of anchored versions committed in blocks.
//! The [`Ledger`] trait abstracts the peers serving a channel.

mod files;
mod memory;
mod writer;

pub use files::{AnchorFile, BatchFile};
pub use memory::MemoryLedger;
pub use writer::ChannelWriter;

use crate::error::Result;
use crate::types::{ContentAddress, DocumentVersion, OperationType};

/// An index entry submitted for commit
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// The index ID to append to
    pub index_id: String,
    /// The kind of operation being anchored
    pub operation_type: OperationType,
    /// Address of the resulting document state, if any
    pub address: Option<ContentAddress>,
    /// Address of the anchor file, for batch writes
    pub anchor_address: Option<ContentAddress>,
}

/// The peers of a ledger, reached per channel
///
/// Calls without a peer are served by any reachable peer on the channel.
pub trait Ledger: Send + Sync {
    /// Peers joined to the channel
    fn peers(&self, channel: &str) -> Result<Vec<String>>;

    /// Current block height of the channel
    fn blockchain_time(&self, channel: &str) -> Result<u64>;

    /// Stores content under its address. Storing identical content again is a
    /// no-op; an address bound to different bytes is a `WriteConflict`.
    fn put_content(&self, channel: &str, address: &ContentAddress, content: &[u8]) -> Result<()>;

    /// Reads content by address
    fn get_content(
        &self,
        channel: &str,
        peer: Option<&str>,
        address: &ContentAddress,
    ) -> Result<Option<Vec<u8>>>;

    /// Commits entries in a single block, returning the committed versions
    fn commit(&self, channel: &str, entries: Vec<IndexEntry>) -> Result<Vec<DocumentVersion>>;

    /// Returns the versions committed for an index ID, in commit order
    fn query_index(
        &self,
        channel: &str,
        peer: Option<&str>,
        index_id: &str,
    ) -> Result<Vec<DocumentVersion>>;
}

/// Sorts versions by transaction time, then transaction number
pub fn sort_chronologically(mut versions: Vec<DocumentVersion>) -> Vec<DocumentVersion> {
    versions.sort_by_key(|v| (v.transaction_time, v.transaction_number));
    versions
}
