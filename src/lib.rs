//! A client for anchoring and resolving Sidetree DID documents.
//!
//! Documents live in a DID namespace (such as `did:sidetree`) whose operations
//! are anchored on a channel of a permissioned ledger. This library builds
//! create, update, delete and resolve requests for a namespace's REST endpoint,
//! writes content, documents and batch/anchor files to a channel, resolves
//! documents over REST or straight from a channel, and offers pure checks for
//! verifying the results.

mod channel;
mod config;
mod did;
mod error;
mod request;
mod resolver;
mod transport;
mod types;
mod verification;

pub use channel::{
    sort_chronologically, AnchorFile, BatchFile, ChannelWriter, IndexEntry, Ledger, MemoryLedger,
};
pub use config::{ClientConfig, NamespaceConfig, NamespaceRegistry, ProtocolParameters};
pub use did::SidetreeDid;
pub use error::{ClientError, Result};
pub use request::{PreparedCreate, RequestBuilder};
pub use resolver::{resolve_did, Resolver, DID_CONTENT_TYPE};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport};
pub use types::{
    AnchorReceipt, ContentAddress, Context, DIDDocument, DocumentVersion, Operation,
    OperationType, PublicKey, ResolutionMetadata, ResolutionOptions, ResolutionResult, Service,
};
pub use verification::{
    content_address, content_matches, error_response_contains, success_response_contains,
    version_count_matches,
};

/// Resolves a Sidetree DID through a REST endpoint
///
/// # Arguments
/// * `endpoint` - The REST endpoint serving the DID's namespace
/// * `did` - The DID to resolve
///
/// # Example
/// ```no_run
/// use sidetree_did_client::resolve;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let result = resolve(
///         "http://localhost:48326/document",
///         "did:sidetree:EiAbc123"
///     ).await?;
///
///     println!("Resolved DID Document: {:?}", result.did_document);
///     Ok(())
/// }
/// ```
pub async fn resolve(endpoint: &str, did: &str) -> Result<ResolutionResult> {
    resolve_did(endpoint, did).await
}
