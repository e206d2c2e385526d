//! Batch and anchor files.
//!
//! A batch file lists encoded operations. An anchor file references its batch
//! file by content address and names the DID unique suffixes it touches.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::ProtocolParameters;
use crate::error::{ClientError, Result};
use crate::types::{ContentAddress, Operation};
use crate::verification::canonicalize;

/// A batch of encoded operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFile {
    /// Base64url encoded canonical operations
    pub operations: Vec<String>,
}

impl BatchFile {
    /// Encodes operations into a batch file, bounded by the protocol
    pub fn new(operations: &[Operation], protocol: &ProtocolParameters) -> Result<Self> {
        if operations.is_empty() {
            return Err(ClientError::InvalidPayload("batch has no operations".to_string()));
        }
        if operations.len() > protocol.max_operations_per_batch {
            return Err(ClientError::InvalidPayload(format!(
                "batch of {} operations exceeds maximum {}",
                operations.len(),
                protocol.max_operations_per_batch
            )));
        }

        let operations = operations
            .iter()
            .map(|op| canonicalize(op).map(|json| URL_SAFE_NO_PAD.encode(json)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { operations })
    }

    /// Decodes the operations held by the batch
    pub fn decode(&self) -> Result<Vec<Operation>> {
        self.operations
            .iter()
            .map(|encoded| -> Result<Operation> {
                let bytes = URL_SAFE_NO_PAD.decode(encoded)?;
                Ok(serde_json::from_slice(&bytes)?)
            })
            .collect()
    }

    /// Canonical bytes written to the content-addressed store
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(canonicalize(self)?.into_bytes())
    }
}

/// Anchor file referencing a batch file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorFile {
    /// Content address of the batch file
    pub batch_file_hash: ContentAddress,

    /// Unique suffixes of the DIDs the batch operates on
    pub did_unique_suffixes: Vec<String>,
}

impl AnchorFile {
    /// Canonical bytes written to the content-addressed store
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(canonicalize(self)?.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperationType;
    use crate::verification::content_address;

    fn delete(suffix: &str) -> Operation {
        Operation {
            operation_type: OperationType::Delete,
            did_unique_suffix: Some(suffix.to_string()),
            payload: None,
        }
    }

    #[test]
    fn test_batch_file_encoding() {
        let ops = vec![delete("a"), delete("b")];
        let batch = BatchFile::new(&ops, &ProtocolParameters::default()).unwrap();
        assert_eq!(batch.operations.len(), 2);
        assert_eq!(batch.decode().unwrap(), ops);
    }

    #[test]
    fn test_batch_limits() {
        let protocol = ProtocolParameters {
            max_operations_per_batch: 2,
            ..ProtocolParameters::default()
        };
        assert!(matches!(
            BatchFile::new(&[], &protocol),
            Err(ClientError::InvalidPayload(_))
        ));
        assert!(matches!(
            BatchFile::new(&[delete("a"), delete("b"), delete("c")], &protocol),
            Err(ClientError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_anchor_file_wire_format() {
        let anchor = AnchorFile {
            batch_file_hash: content_address(b"batch").unwrap(),
            did_unique_suffixes: vec!["a".to_string()],
        };
        let json: serde_json::Value = serde_json::from_slice(&anchor.to_bytes().unwrap()).unwrap();
        assert_eq!(json["batchFileHash"], anchor.batch_file_hash.as_str());
        assert_eq!(json["didUniqueSuffixes"][0], "a");
    }
}
