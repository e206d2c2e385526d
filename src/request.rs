//! Construction of Sidetree operation and resolution requests.
//!
//! Payloads are validated as DID Documents, canonicalized and encoded as
//! unpadded base64url. The unique suffix of a new DID is the content address
//! of its encoded create payload.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Method;
use tracing::debug;
use url::Url;

use crate::config::{NamespaceConfig, NamespaceRegistry};
use crate::did::SidetreeDid;
use crate::error::{ClientError, Result};
use crate::transport::HttpRequest;
use crate::types::{DIDDocument, Operation, OperationType};
use crate::verification::{canonicalize, content_address};

/// A create request together with the DID it will produce
#[derive(Debug, Clone)]
pub struct PreparedCreate {
    /// The DID assigned to the document
    pub did: SidetreeDid,
    /// The request to submit
    pub request: HttpRequest,
    /// The encoded create payload, usable as initial values
    pub encoded_payload: String,
}

/// Builds requests for the registered namespaces
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    registry: Arc<NamespaceRegistry>,
}

impl RequestBuilder {
    /// Creates a builder over the given namespace registry
    pub fn new(registry: Arc<NamespaceRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the namespace registry
    pub fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    /// Builds a create request for a DID Document payload
    pub fn create(&self, endpoint: &str, payload: &str, namespace: &str) -> Result<PreparedCreate> {
        let ns = self.registry.get(namespace)?;
        let document = parse_document(payload)?;
        if !document.id.is_empty() {
            return Err(ClientError::InvalidPayload(
                "create payload must not carry an id".to_string(),
            ));
        }

        let encoded_payload = encode_document(&document, ns)?;
        let unique_suffix = content_address(encoded_payload.as_bytes())?;
        let did = SidetreeDid::new(ns.namespace.clone(), unique_suffix.to_string());

        let request = HttpRequest {
            method: Method::POST,
            url: endpoint_url(endpoint, ns)?,
            body: Some(Operation {
                operation_type: OperationType::Create,
                did_unique_suffix: None,
                payload: Some(encoded_payload.clone()),
            }),
        };

        debug!(namespace, did = %did, url = %request.url, "built create request");
        Ok(PreparedCreate {
            did,
            request,
            encoded_payload,
        })
    }

    /// Builds an update request replacing the document of an existing DID
    pub fn update(&self, endpoint: &str, did: &str, payload: &str) -> Result<HttpRequest> {
        let did = SidetreeDid::parse(did, &self.registry)?;
        let ns = self.registry.get(&did.namespace)?;
        let mut document = parse_document(payload)?;
        if !document.id.is_empty() && document.id != did.did() {
            return Err(ClientError::InvalidPayload(format!(
                "document id {} does not match {}",
                document.id,
                did.did()
            )));
        }
        document.id.clear();

        let request = HttpRequest {
            method: Method::POST,
            url: endpoint_url(endpoint, ns)?,
            body: Some(Operation {
                operation_type: OperationType::Update,
                did_unique_suffix: Some(did.unique_suffix.clone()),
                payload: Some(encode_document(&document, ns)?),
            }),
        };

        debug!(did = %did, url = %request.url, "built update request");
        Ok(request)
    }

    /// Builds a delete request for an existing DID
    pub fn delete(&self, endpoint: &str, did: &str) -> Result<HttpRequest> {
        let did = SidetreeDid::parse(did, &self.registry)?;
        let ns = self.registry.get(&did.namespace)?;

        let request = HttpRequest {
            method: Method::POST,
            url: endpoint_url(endpoint, ns)?,
            body: Some(Operation {
                operation_type: OperationType::Delete,
                did_unique_suffix: Some(did.unique_suffix.clone()),
                payload: None,
            }),
        };

        debug!(did = %did, url = %request.url, "built delete request");
        Ok(request)
    }

    /// Builds a resolution request for a DID
    pub fn resolve(&self, endpoint: &str, did: &str) -> Result<HttpRequest> {
        let did = SidetreeDid::parse(did, &self.registry)?;
        self.resolve_did(endpoint, &did)
    }

    /// Builds a resolution request that carries the create payload as initial values
    pub fn resolve_with_initial_value(
        &self,
        endpoint: &str,
        created: &PreparedCreate,
    ) -> Result<HttpRequest> {
        let did = created
            .did
            .clone()
            .with_initial_values(created.encoded_payload.clone());
        self.resolve_did(endpoint, &did)
    }

    fn resolve_did(&self, endpoint: &str, did: &SidetreeDid) -> Result<HttpRequest> {
        let ns = self.registry.get(&did.namespace)?;
        let mut url = endpoint_url(endpoint, ns)?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidPayload(format!("cannot append to {}", endpoint)))?
            .pop_if_empty()
            .push(&did.to_string());

        debug!(did = %did, url = %url, "built resolve request");
        Ok(HttpRequest {
            method: Method::GET,
            url,
            body: None,
        })
    }
}

/// Parses a payload as a DID Document, checking key id uniqueness
pub(crate) fn parse_document(payload: &str) -> Result<DIDDocument> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| ClientError::InvalidPayload(e.to_string()))?;
    if !value.is_object() {
        return Err(ClientError::InvalidPayload(
            "document must be a JSON object".to_string(),
        ));
    }

    let document: DIDDocument =
        serde_json::from_value(value).map_err(|e| ClientError::InvalidPayload(e.to_string()))?;

    let mut ids: Vec<&str> = document.public_key.iter().map(|k| k.id.as_str()).collect();
    ids.sort_unstable();
    if let Some(dup) = ids.windows(2).find(|w| w[0] == w[1]) {
        return Err(ClientError::InvalidPayload(format!(
            "duplicate public key id {}",
            dup[0]
        )));
    }

    Ok(document)
}

/// Encodes a document as unpadded base64url canonical JSON, bounded by the protocol
pub(crate) fn encode_document(document: &DIDDocument, ns: &NamespaceConfig) -> Result<String> {
    let encoded = URL_SAFE_NO_PAD.encode(canonicalize(document)?);
    let max = ns.current_protocol()?.max_operation_byte_size;
    if encoded.len() > max {
        return Err(ClientError::InvalidPayload(format!(
            "operation size {} exceeds maximum {}",
            encoded.len(),
            max
        )));
    }
    Ok(encoded)
}

/// Decodes an encoded payload back into a document, with the same checks as
/// [`parse_document`]
pub(crate) fn decode_document(encoded: &str) -> Result<DIDDocument> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded)?;
    let payload =
        String::from_utf8(bytes).map_err(|e| ClientError::InvalidPayload(e.to_string()))?;
    parse_document(&payload)
}

/// Resolves the endpoint, appending the namespace base path when it has none
fn endpoint_url(endpoint: &str, ns: &NamespaceConfig) -> Result<Url> {
    let mut url = Url::parse(endpoint)?;
    if url.path() == "/" || url.path().is_empty() {
        url.set_path(&ns.base_path);
    }
    Ok(url)
}
