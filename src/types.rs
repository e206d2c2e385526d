//! Core types for Sidetree DID anchoring and resolution.
//!
//! This module provides the fundamental data structures shared by the request
//! builder, channel writer and resolver: DID Documents, Sidetree operations,
//! content addresses and anchored document versions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The default JSON-LD context for DID Documents
pub const DID_CONTEXT: &str = "https://w3id.org/did/v1";

/// A DID Document as anchored in a Sidetree namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DIDDocument {
    /// The context of the DID Document
    #[serde(rename = "@context", default = "default_context")]
    pub context: Context,

    /// The DID itself. Empty in create payloads, assigned by the namespace.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Public keys associated with this DID
    #[serde(rename = "publicKey", default, skip_serializing_if = "Vec::is_empty")]
    pub public_key: Vec<PublicKey>,

    /// Services associated with this DID
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,

    /// Deactivation status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,

    /// Members not modelled above, such as `authentication` or `controller`
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// JSON-LD context: a single URI or a list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Context {
    Single(String),
    Many(Vec<String>),
}

impl Context {
    /// Returns the context URIs in order
    pub fn uris(&self) -> Vec<&str> {
        match self {
            Context::Single(uri) => vec![uri.as_str()],
            Context::Many(uris) => uris.iter().map(String::as_str).collect(),
        }
    }
}

fn default_context() -> Context {
    Context::Many(vec![DID_CONTEXT.to_string()])
}

impl DIDDocument {
    /// Creates an empty document carrying only the default context
    pub fn new() -> Self {
        Self {
            context: default_context(),
            id: String::new(),
            public_key: Vec::new(),
            service: Vec::new(),
            deactivated: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl Default for DIDDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// A public key in a DID Document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicKey {
    /// The identifier of this key, unique within the document
    pub id: String,

    /// The type of the key
    #[serde(rename = "type")]
    pub key_type: String,

    /// The controller of this key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,

    /// The public key in base58 format
    #[serde(rename = "publicKeyBase58", default, skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,

    /// The public key as a JWK
    #[serde(rename = "publicKeyJwk", default, skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<serde_json::Value>,

    /// Other key members, kept as written
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A service endpoint in a DID Document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// The unique identifier for this service
    pub id: String,

    /// The type of the service
    #[serde(rename = "type")]
    pub service_type: String,

    /// The endpoint URL or object
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: serde_json::Value,

    /// Other service members, kept as written
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Kind of a Sidetree operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A Sidetree operation as submitted to a REST endpoint or written into a batch file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// The kind of operation
    #[serde(rename = "type")]
    pub operation_type: OperationType,

    /// Unique suffix of the target DID; absent for create operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did_unique_suffix: Option<String>,

    /// Base64url encoded canonical document; absent for delete operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Address of immutable content in a channel's content-addressed store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(String);

impl ContentAddress {
    pub(crate) fn new(address: String) -> Self {
        Self(address)
    }

    /// Returns the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One anchored write for an index ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersion {
    /// The index ID the version was written under
    pub index_id: String,

    /// The kind of operation that produced this version
    pub operation_type: OperationType,

    /// Address of the document state; absent for delete operations
    pub address: Option<ContentAddress>,

    /// Address of the anchor file, for versions written through a batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_address: Option<ContentAddress>,

    /// Block number of the transaction that committed this version
    pub transaction_time: u64,

    /// Position of the transaction within its block
    pub transaction_number: u64,
}

/// Addresses produced by writing a batch file and its anchor file
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorReceipt {
    /// Address of the batch file
    pub batch_address: ContentAddress,

    /// Address of the anchor file referencing the batch file
    pub anchor_address: ContentAddress,

    /// One version per anchored operation, in batch order
    pub versions: Vec<DocumentVersion>,
}

/// Resolution result containing the DID Document and metadata
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    /// The resolved DID Document
    pub did_document: DIDDocument,

    /// Metadata about the resolution process
    pub metadata: ResolutionMetadata,
}

/// Metadata about the resolution process
#[derive(Debug, Clone)]
pub struct ResolutionMetadata {
    /// Content type of the resolved document
    pub content_type: String,

    /// When the document was retrieved
    pub retrieved: DateTime<Utc>,

    /// How long the resolution took
    pub duration: std::time::Duration,

    /// Number of versions applied to produce the document; unknown when
    /// resolved over REST
    pub versions_count: Option<usize>,
}

/// Options for resolving a document from a channel
#[derive(Debug, Clone, Default)]
pub struct ResolutionOptions {
    /// Resolve the state after this many versions (1-based)
    pub version: Option<usize>,

    /// Resolve the state as of this blockchain time
    pub blockchain_time: Option<u64>,
}
