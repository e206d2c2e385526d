//! Core DID resolution functionality.
//!
//! This module resolves Sidetree DIDs over REST, queries a channel's document
//! index by ID (optionally on a specific set of peers), and resolves documents
//! directly from a channel by replaying their anchored versions.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info};

use crate::channel::{sort_chronologically, Ledger};
use crate::config::{ClientConfig, NamespaceRegistry};
use crate::did::SidetreeDid;
use crate::error::{ClientError, Result};
use crate::request::{PreparedCreate, RequestBuilder};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Transport};
use crate::types::{
    DIDDocument, DocumentVersion, OperationType, ResolutionMetadata, ResolutionOptions,
    ResolutionResult,
};
use crate::verification::{content_address, verify_address};

/// Content type of resolved DID Documents
pub const DID_CONTENT_TYPE: &str = "application/did+json";

/// Core resolver for Sidetree DIDs
pub struct Resolver {
    /// Transport to REST endpoints
    transport: Arc<dyn Transport>,
    /// Ledger serving channel queries
    ledger: Arc<dyn Ledger>,
    /// Builder for resolution requests
    builder: RequestBuilder,
}

impl Resolver {
    /// Creates a new Resolver instance
    pub fn new(
        transport: Arc<dyn Transport>,
        ledger: Arc<dyn Ledger>,
        registry: Arc<NamespaceRegistry>,
    ) -> Self {
        Self {
            transport,
            ledger,
            builder: RequestBuilder::new(registry),
        }
    }

    /// Sends a prepared request as is, returning the raw response
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.transport.send(request).await
    }

    /// Resolves a DID through a REST endpoint
    ///
    /// # Example
    /// ```no_run
    /// use std::sync::Arc;
    /// use sidetree_did_client::{ClientConfig, HttpTransport, MemoryLedger, Resolver};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = ClientConfig::load(None)?;
    ///     let resolver = Resolver::new(
    ///         Arc::new(HttpTransport::from_config(&config)?),
    ///         Arc::new(MemoryLedger::new()),
    ///         Arc::new(config.registry()?),
    ///     );
    ///     let result = resolver
    ///         .resolve("http://localhost:48326/document", "did:sidetree:EiAbc")
    ///         .await?;
    ///     println!("Resolved DID Document: {:?}", result.did_document);
    ///     Ok(())
    /// }
    /// ```
    pub async fn resolve(&self, endpoint: &str, did: &str) -> Result<ResolutionResult> {
        let start_time = Instant::now();
        let request = self.builder.resolve(endpoint, did)?;
        let response = self.transport.send(&request).await?;
        interpret_resolution(response, did, start_time)
    }

    /// Resolves a DID that may not be anchored yet, using its create payload
    pub async fn resolve_with_initial_value(
        &self,
        endpoint: &str,
        created: &PreparedCreate,
    ) -> Result<ResolutionResult> {
        let start_time = Instant::now();

        let expected = content_address(created.encoded_payload.as_bytes())?;
        if expected.as_str() != created.did.unique_suffix {
            return Err(ClientError::InvalidPayload(format!(
                "initial values do not hash to {}",
                created.did.unique_suffix
            )));
        }

        let request = self.builder.resolve_with_initial_value(endpoint, created)?;
        let response = self.transport.send(&request).await?;
        interpret_resolution(response, &created.did.did(), start_time)
    }

    /// Returns the versions of a document anchored under `index_id`
    ///
    /// With a peer set, every listed peer is queried and the results are
    /// merged. An empty result is not an error.
    pub fn query_by_index(
        &self,
        index_id: &str,
        channel: &str,
        peers: Option<&[&str]>,
    ) -> Result<Vec<DocumentVersion>> {
        let versions = match peers {
            None => sort_chronologically(self.ledger.query_index(channel, None, index_id)?),
            Some(peers) => {
                let mut merged = BTreeMap::new();
                for versions in self.query_by_index_on_peers(index_id, channel, peers)?.into_values() {
                    for v in versions {
                        merged.insert((v.transaction_time, v.transaction_number), v);
                    }
                }
                merged.into_values().collect()
            }
        };

        debug!(channel, index_id, count = versions.len(), "queried index");
        Ok(versions)
    }

    /// Queries each peer separately; an empty peer set means every joined peer
    pub fn query_by_index_on_peers(
        &self,
        index_id: &str,
        channel: &str,
        peers: &[&str],
    ) -> Result<BTreeMap<String, Vec<DocumentVersion>>> {
        let peers: Vec<String> = if peers.is_empty() {
            self.ledger.peers(channel)?
        } else {
            peers.iter().map(|p| (*p).to_string()).collect()
        };

        peers
            .into_iter()
            .map(|peer| -> Result<(String, Vec<DocumentVersion>)> {
                let versions = self.ledger.query_index(channel, Some(peer.as_str()), index_id)?;
                debug!(channel, peer = %peer, index_id, count = versions.len(), "queried peer");
                Ok((peer, sort_chronologically(versions)))
            })
            .collect()
    }

    /// Resolves a DID directly from a channel by replaying its versions
    pub fn resolve_from_channel(
        &self,
        did: &str,
        channel: &str,
        options: Option<ResolutionOptions>,
    ) -> Result<ResolutionResult> {
        let start_time = Instant::now();
        let did = SidetreeDid::parse(did, self.builder.registry())?;

        let versions = self.query_by_index(&did.unique_suffix, channel, None)?;
        if versions.is_empty() {
            return Err(ClientError::NotFound(did.did()));
        }

        // blockchain time bounds the history first; version counts within it
        let options = options.unwrap_or_default();
        let mut applied = &versions[..];
        if let Some(time) = options.blockchain_time {
            let count = applied
                .iter()
                .take_while(|v| v.transaction_time <= time)
                .count();
            applied = &applied[..count];
        }
        if let Some(n) = options.version {
            if n == 0 || n > applied.len() {
                return Err(ClientError::NotFound(format!("{} version {}", did.did(), n)));
            }
            applied = &applied[..n];
        }

        let latest = applied
            .last()
            .ok_or_else(|| ClientError::NotFound(did.did()))?;
        if latest.operation_type == OperationType::Delete {
            return Err(ClientError::NotFound(format!("{} has been deleted", did.did())));
        }

        let address = latest
            .address
            .as_ref()
            .ok_or_else(|| ClientError::NotFound(did.did()))?;
        let content = self
            .ledger
            .get_content(channel, None, address)?
            .ok_or_else(|| ClientError::NotFound(address.to_string()))?;
        if !verify_address(address, &content)? {
            return Err(ClientError::InvalidPayload(format!(
                "content at {} does not match its address",
                address
            )));
        }

        let mut document: DIDDocument = serde_json::from_slice(&content)?;
        document.id = did.did();

        info!(did = %did, channel, versions = applied.len(), "resolved from channel");
        Ok(ResolutionResult {
            did_document: document,
            metadata: ResolutionMetadata {
                content_type: DID_CONTENT_TYPE.to_string(),
                retrieved: Utc::now(),
                duration: start_time.elapsed(),
                versions_count: Some(applied.len()),
            },
        })
    }
}

/// Convenience function for resolving a DID over REST with configuration
/// loaded from the environment
pub async fn resolve_did(endpoint: &str, did: &str) -> Result<ResolutionResult> {
    let start_time = Instant::now();
    let config = ClientConfig::load(None)?;
    let transport = HttpTransport::from_config(&config)?;
    let builder = RequestBuilder::new(Arc::new(config.registry()?));

    let request = builder.resolve(endpoint, did)?;
    let response = transport.send(&request).await?;
    interpret_resolution(response, did, start_time)
}

fn interpret_resolution(
    response: HttpResponse,
    did: &str,
    start_time: Instant,
) -> Result<ResolutionResult> {
    match response.status {
        404 | 410 => return Err(ClientError::NotFound(did.to_string())),
        status if !response.is_success() => {
            return Err(ClientError::RequestFailed {
                status,
                body: response.body,
            })
        }
        _ => {}
    }

    let mut body: serde_json::Value = serde_json::from_str(&response.body)?;
    let document = match body.get_mut("didDocument") {
        Some(doc) => doc.take(),
        None => body,
    };
    let document: DIDDocument = serde_json::from_value(document)?;

    if document.deactivated == Some(true) {
        return Err(ClientError::NotFound(format!("{} is deactivated", did)));
    }

    info!(did, "resolved DID document");
    Ok(ResolutionResult {
        did_document: document,
        metadata: ResolutionMetadata {
            content_type: DID_CONTENT_TYPE.to_string(),
            retrieved: Utc::now(),
            duration: start_time.elapsed(),
            versions_count: None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelWriter, MemoryLedger};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    const CHANNEL: &str = "mychannel";
    const ENDPOINT: &str = "http://localhost:48326/document";
    const PEERS: [&str; 2] = ["peer0.org1.example.com", "peer1.org1.example.com"];

    /// Replies with a canned response and records the requests it saw
    struct CannedTransport {
        response: HttpResponse,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl CannedTransport {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                response: HttpResponse {
                    status,
                    body: body.to_string(),
                },
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().push(request.clone());
            Ok(self.response.clone())
        }
    }

    fn setup(transport: Arc<CannedTransport>) -> (Arc<MemoryLedger>, ChannelWriter, Resolver) {
        let config = ClientConfig::default();
        let ledger = Arc::new(MemoryLedger::new().with_channel(CHANNEL, &PEERS));
        let writer = ChannelWriter::new(ledger.clone(), config.namespaces[0].clone());
        let resolver = Resolver::new(transport, ledger.clone(), Arc::new(config.registry().unwrap()));
        (ledger, writer, resolver)
    }

    fn doc_with_service(endpoint: &str) -> String {
        format!(
            r#"{{"service": [{{"id": "hub", "type": "IdentityHub", "serviceEndpoint": "{}"}}]}}"#,
            endpoint
        )
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let transport = CannedTransport::new(
            200,
            r#"{"@context":"https://w3id.org/did-resolution/v1","didDocument":{"@context":["https://w3id.org/did/v1"],"id":"did:sidetree:EiAbc"}}"#,
        );
        let (_, _, resolver) = setup(transport.clone());

        let result = resolver.resolve(ENDPOINT, "did:sidetree:EiAbc").await.unwrap();
        assert_eq!(result.did_document.id, "did:sidetree:EiAbc");
        assert_eq!(result.metadata.content_type, DID_CONTENT_TYPE);
        assert_eq!(result.metadata.versions_count, None);

        let seen = transport.seen.lock();
        assert_eq!(seen[0].url.as_str(), format!("{}/did:sidetree:EiAbc", ENDPOINT));
    }

    #[tokio::test]
    async fn test_resolve_bare_document_body() {
        let transport = CannedTransport::new(200, r#"{"id":"did:sidetree:EiAbc"}"#);
        let (_, _, resolver) = setup(transport);
        let result = resolver.resolve(ENDPOINT, "did:sidetree:EiAbc").await.unwrap();
        assert_eq!(result.did_document.id, "did:sidetree:EiAbc");
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        for status in [404, 410] {
            let (_, _, resolver) = setup(CannedTransport::new(status, "document not found"));
            assert!(matches!(
                resolver.resolve(ENDPOINT, "did:sidetree:EiAbc").await,
                Err(ClientError::NotFound(_))
            ));
        }

        let (_, _, resolver) =
            setup(CannedTransport::new(200, r#"{"id":"did:sidetree:EiAbc","deactivated":true}"#));
        assert!(matches!(
            resolver.resolve(ENDPOINT, "did:sidetree:EiAbc").await,
            Err(ClientError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_server_error() {
        let (_, _, resolver) = setup(CannedTransport::new(500, "boom"));
        assert!(matches!(
            resolver.resolve(ENDPOINT, "did:sidetree:EiAbc").await,
            Err(ClientError::RequestFailed { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_unknown_namespace_sends_nothing() {
        let transport = CannedTransport::new(200, "{}");
        let (_, _, resolver) = setup(transport.clone());
        assert!(matches!(
            resolver.resolve(ENDPOINT, "did:unknown:EiAbc").await,
            Err(ClientError::InvalidNamespace(_))
        ));
        assert!(transport.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_with_initial_value_checks_suffix() {
        let transport = CannedTransport::new(200, r#"{"id":"ignored"}"#);
        let (_, _, resolver) = setup(transport.clone());
        let builder = RequestBuilder::new(Arc::new(ClientConfig::default().registry().unwrap()));

        let created = builder.create(ENDPOINT, "{}", "did:sidetree").unwrap();
        resolver
            .resolve_with_initial_value(ENDPOINT, &created)
            .await
            .unwrap();
        assert!(transport.seen.lock()[0]
            .url
            .as_str()
            .contains(";initial-values="));

        let mut tampered = created.clone();
        tampered.encoded_payload.push('A');
        assert!(matches!(
            resolver.resolve_with_initial_value(ENDPOINT, &tampered).await,
            Err(ClientError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_query_by_index_counts_writes() {
        let (_, writer, resolver) = setup(CannedTransport::new(200, "{}"));
        assert!(resolver.query_by_index("docX", CHANNEL, None).unwrap().is_empty());

        for n in 0..3 {
            writer
                .create_document("docX", &doc_with_service(&format!("https://hub{}", n)), CHANNEL)
                .unwrap();
        }
        writer.create_document("other", "{}", CHANNEL).unwrap();

        assert_eq!(resolver.query_by_index("docX", CHANNEL, None).unwrap().len(), 3);
        assert_eq!(
            resolver.query_by_index("docX", CHANNEL, Some(&PEERS[..])).unwrap().len(),
            3
        );

        let per_peer = resolver.query_by_index_on_peers("docX", CHANNEL, &[]).unwrap();
        assert_eq!(per_peer.len(), 2);
        assert!(per_peer.values().all(|versions| versions.len() == 3));
    }

    #[test]
    fn test_query_on_unreachable_peer() {
        let (ledger, writer, resolver) = setup(CannedTransport::new(200, "{}"));
        writer.create_document("docX", "{}", CHANNEL).unwrap();
        ledger.set_peer_online(CHANNEL, PEERS[1], false).unwrap();

        assert_eq!(
            resolver.query_by_index("docX", CHANNEL, Some(&PEERS[..1])).unwrap().len(),
            1
        );
        assert!(matches!(
            resolver.query_by_index("docX", CHANNEL, Some(&PEERS[..])),
            Err(ClientError::ChannelUnavailable(_))
        ));
        assert!(matches!(
            resolver.query_by_index("docX", "nochannel", None),
            Err(ClientError::ChannelUnavailable(_))
        ));
    }

    #[test]
    fn test_resolve_from_channel_versions() {
        let (_, writer, resolver) = setup(CannedTransport::new(200, "{}"));
        let did = "did:sidetree:docX";
        for n in 1..=3 {
            writer
                .create_document("docX", &doc_with_service(&format!("https://hub{}", n)), CHANNEL)
                .unwrap();
        }

        let latest = resolver.resolve_from_channel(did, CHANNEL, None).unwrap();
        assert_eq!(latest.did_document.id, did);
        assert_eq!(latest.did_document.service[0].service_endpoint, "https://hub3");
        assert_eq!(latest.metadata.versions_count, Some(3));

        let first = resolver
            .resolve_from_channel(
                did,
                CHANNEL,
                Some(ResolutionOptions {
                    version: Some(1),
                    ..ResolutionOptions::default()
                }),
            )
            .unwrap();
        assert_eq!(first.did_document.service[0].service_endpoint, "https://hub1");

        // each write is its own block, so block 2 holds the second version
        let as_of = resolver
            .resolve_from_channel(
                did,
                CHANNEL,
                Some(ResolutionOptions {
                    blockchain_time: Some(2),
                    ..ResolutionOptions::default()
                }),
            )
            .unwrap();
        assert_eq!(as_of.did_document.service[0].service_endpoint, "https://hub2");

        assert!(matches!(
            resolver.resolve_from_channel(
                did,
                CHANNEL,
                Some(ResolutionOptions {
                    version: Some(4),
                    ..ResolutionOptions::default()
                })
            ),
            Err(ClientError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_from_channel_version_within_time() {
        let (_, writer, resolver) = setup(CannedTransport::new(200, "{}"));
        let did = "did:sidetree:docX";
        for n in 1..=3 {
            writer
                .create_document("docX", &doc_with_service(&format!("https://hub{}", n)), CHANNEL)
                .unwrap();
        }

        let both = |version, time| {
            resolver.resolve_from_channel(
                did,
                CHANNEL,
                Some(ResolutionOptions {
                    version: Some(version),
                    blockchain_time: Some(time),
                }),
            )
        };

        let result = both(1, 2).unwrap();
        assert_eq!(result.did_document.service[0].service_endpoint, "https://hub1");
        assert_eq!(result.metadata.versions_count, Some(1));

        let result = both(2, 2).unwrap();
        assert_eq!(result.did_document.service[0].service_endpoint, "https://hub2");

        // only two versions exist by block 2
        assert!(matches!(both(3, 2), Err(ClientError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_document_with_string_context() {
        let transport = CannedTransport::new(
            200,
            r#"{"didDocument":{"@context":"https://w3id.org/did/v1","id":"did:sidetree:EiAbc"}}"#,
        );
        let (_, _, resolver) = setup(transport);
        let result = resolver.resolve(ENDPOINT, "did:sidetree:EiAbc").await.unwrap();
        assert_eq!(result.did_document.context.uris(), vec!["https://w3id.org/did/v1"]);
    }

    #[test]
    fn test_resolve_deleted_document_from_channel() {
        let (_, writer, resolver) = setup(CannedTransport::new(200, "{}"));
        writer.create_document("docX", "{}", CHANNEL).unwrap();
        writer.delete_document("docX", CHANNEL).unwrap();

        assert!(matches!(
            resolver.resolve_from_channel("did:sidetree:docX", CHANNEL, None),
            Err(ClientError::NotFound(_))
        ));
        assert!(matches!(
            resolver.resolve_from_channel("did:sidetree:missing", CHANNEL, None),
            Err(ClientError::NotFound(_))
        ));
        assert!(matches!(
            resolver.resolve_from_channel("did:unknown:docX", CHANNEL, None),
            Err(ClientError::InvalidNamespace(_))
        ));
    }

    #[test]
    fn test_resolve_from_channel_detects_tampered_content() {
        let (ledger, _, resolver) = setup(CannedTransport::new(200, "{}"));
        let address = content_address(b"{}").unwrap();
        ledger.put_content(CHANNEL, &address, b"{\"id\":1}").unwrap();
        ledger
            .commit(
                CHANNEL,
                vec![crate::channel::IndexEntry {
                    index_id: "docX".to_string(),
                    operation_type: OperationType::Create,
                    address: Some(address),
                    anchor_address: None,
                }],
            )
            .unwrap();

        assert!(matches!(
            resolver.resolve_from_channel("did:sidetree:docX", CHANNEL, None),
            Err(ClientError::InvalidPayload(_))
        ));
    }
}
