//! Channel writes.
//!
//! Writes content to a channel's content-addressed store and anchors document
//! versions in its index, either directly or through a batch file and anchor
//! file.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::NamespaceConfig;
use crate::error::{ClientError, Result};
use crate::request::{decode_document, encode_document, parse_document};
use crate::types::{AnchorReceipt, ContentAddress, DIDDocument, Operation, OperationType};
use crate::verification::{canonicalize, content_address};

use super::{AnchorFile, BatchFile, IndexEntry, Ledger};

/// Writes content and anchors documents for one namespace
pub struct ChannelWriter {
    ledger: Arc<dyn Ledger>,
    namespace: NamespaceConfig,
}

impl ChannelWriter {
    /// Creates a writer over a ledger for the given namespace
    pub fn new(ledger: Arc<dyn Ledger>, namespace: NamespaceConfig) -> Self {
        Self { ledger, namespace }
    }

    /// Writes content and returns its address
    pub fn write_content(&self, content: &[u8], channel: &str) -> Result<ContentAddress> {
        let address = content_address(content)?;
        self.ledger.put_content(channel, &address, content)?;
        debug!(channel, %address, size = content.len(), "wrote content");
        Ok(address)
    }

    /// Reads content back by address
    pub fn read_content(&self, address: &ContentAddress, channel: &str) -> Result<Vec<u8>> {
        self.ledger
            .get_content(channel, None, address)?
            .ok_or_else(|| ClientError::NotFound(address.to_string()))
    }

    /// Stores a document and anchors it as the next version of `id`
    pub fn create_document(&self, id: &str, document: &str, channel: &str) -> Result<ContentAddress> {
        let document = parse_document(document)?;
        let operation_type = self.next_operation_type(id, channel)?;
        let address = self.write_document(&document, channel)?;

        self.ledger.commit(
            channel,
            vec![IndexEntry {
                index_id: id.to_string(),
                operation_type,
                address: Some(address.clone()),
                anchor_address: None,
            }],
        )?;

        info!(channel, id, %address, %operation_type, "anchored document version");
        Ok(address)
    }

    /// Anchors a deletion of `id`
    pub fn delete_document(&self, id: &str, channel: &str) -> Result<()> {
        if self.next_operation_type(id, channel)? == OperationType::Create {
            return Err(ClientError::NotFound(id.to_string()));
        }

        self.ledger.commit(
            channel,
            vec![IndexEntry {
                index_id: id.to_string(),
                operation_type: OperationType::Delete,
                address: None,
                anchor_address: None,
            }],
        )?;

        info!(channel, id, "anchored document deletion");
        Ok(())
    }

    /// Writes a batch file holding one operation for `id` plus its anchor file
    pub fn write_batch_and_anchor(
        &self,
        id: &str,
        document: &DIDDocument,
        channel: &str,
    ) -> Result<AnchorReceipt> {
        let operation_type = self.next_operation_type(id, channel)?;
        let operation = Operation {
            operation_type,
            did_unique_suffix: (operation_type != OperationType::Create).then(|| id.to_string()),
            payload: Some(encode_document(document, &self.namespace)?),
        };
        self.anchor_operations(id, &[operation], channel)
    }

    /// Writes a batch file of operations on `id` plus its anchor file, and
    /// anchors one version per operation in a single block
    ///
    /// Every operation is checked against the document's history before
    /// anything is written: a deleted document fails with `NotFound`, while
    /// creating an existing document, updating or deleting a missing one, a
    /// mismatched unique suffix or an invalid payload fail with
    /// `InvalidPayload`.
    pub fn anchor_operations(
        &self,
        id: &str,
        operations: &[Operation],
        channel: &str,
    ) -> Result<AnchorReceipt> {
        let protocol = self
            .namespace
            .protocol_at(self.ledger.blockchain_time(channel)?)?;
        let batch = BatchFile::new(operations, protocol)?;

        let mut latest = self.latest_operation(id, channel)?;
        let mut documents = Vec::with_capacity(operations.len());
        for operation in operations {
            check_transition(id, latest, operation)?;
            latest = Some(operation.operation_type);

            documents.push(match (operation.operation_type, &operation.payload) {
                (OperationType::Delete, _) => None,
                (_, Some(payload)) => {
                    if payload.len() > protocol.max_operation_byte_size {
                        return Err(ClientError::InvalidPayload(format!(
                            "operation size {} exceeds maximum {}",
                            payload.len(),
                            protocol.max_operation_byte_size
                        )));
                    }
                    Some(decode_document(payload)?)
                }
                (op, None) => {
                    return Err(ClientError::InvalidPayload(format!(
                        "{} operation has no payload",
                        op
                    )))
                }
            });
        }

        let mut entries = Vec::with_capacity(operations.len());
        for (operation, document) in operations.iter().zip(&documents) {
            let address = match document {
                Some(document) => Some(self.write_document(document, channel)?),
                None => None,
            };
            entries.push(IndexEntry {
                index_id: id.to_string(),
                operation_type: operation.operation_type,
                address,
                anchor_address: None,
            });
        }

        let batch_address = self.write_content(&batch.to_bytes()?, channel)?;
        let anchor = AnchorFile {
            batch_file_hash: batch_address.clone(),
            did_unique_suffixes: vec![id.to_string()],
        };
        let anchor_address = self.write_content(&anchor.to_bytes()?, channel)?;

        for entry in &mut entries {
            entry.anchor_address = Some(anchor_address.clone());
        }
        let versions = self.ledger.commit(channel, entries)?;

        info!(
            channel,
            id,
            %batch_address,
            %anchor_address,
            operations = operations.len(),
            "anchored batch"
        );
        Ok(AnchorReceipt {
            batch_address,
            anchor_address,
            versions,
        })
    }

    fn write_document(&self, document: &DIDDocument, channel: &str) -> Result<ContentAddress> {
        self.write_content(canonicalize(document)?.as_bytes(), channel)
    }

    fn latest_operation(&self, id: &str, channel: &str) -> Result<Option<OperationType>> {
        let existing = self.ledger.query_index(channel, None, id)?;
        Ok(existing.last().map(|v| v.operation_type))
    }

    fn next_operation_type(&self, id: &str, channel: &str) -> Result<OperationType> {
        match self.latest_operation(id, channel)? {
            Some(OperationType::Delete) => {
                Err(ClientError::NotFound(format!("{} has been deleted", id)))
            }
            Some(_) => Ok(OperationType::Update),
            None => Ok(OperationType::Create),
        }
    }
}

/// Checks that `operation` may follow the latest anchored operation on `id`
fn check_transition(id: &str, latest: Option<OperationType>, operation: &Operation) -> Result<()> {
    match (&operation.did_unique_suffix, operation.operation_type) {
        (Some(suffix), _) if suffix != id => {
            return Err(ClientError::InvalidPayload(format!(
                "operation targets {} but is anchored under {}",
                suffix, id
            )))
        }
        (None, op @ (OperationType::Update | OperationType::Delete)) => {
            return Err(ClientError::InvalidPayload(format!(
                "{} operation has no unique suffix",
                op
            )))
        }
        _ => {}
    }

    match (latest, operation.operation_type) {
        (Some(OperationType::Delete), _) => {
            Err(ClientError::NotFound(format!("{} has been deleted", id)))
        }
        (Some(_), OperationType::Create) => {
            Err(ClientError::InvalidPayload(format!("{} already exists", id)))
        }
        (None, op @ (OperationType::Update | OperationType::Delete)) => Err(
            ClientError::InvalidPayload(format!("cannot {} {}: no such document", op, id)),
        ),
        _ => Ok(()),
    }
}
