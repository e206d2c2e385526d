//! Content address calculation.
//!
//! A content address is the base58 encoding of the sha2-256 multihash of the
//! content bytes. Documents are canonicalized (JCS) before hashing so that
//! equal documents always share an address.

use base58::ToBase58;
use multihash::Multihash;
use serde::Serialize;
use serde_json_canonicalizer::to_string as jcs_canonicalize;
use sha2::{Digest, Sha256};

use crate::error::{ClientError, Result};
use crate::types::ContentAddress;

use super::SHA2_256;

/// Calculates the content address of raw bytes
pub fn content_address(content: &[u8]) -> Result<ContentAddress> {
    let hash = Sha256::digest(content);

    let multihash = Multihash::<64>::wrap(SHA2_256, &hash)
        .map_err(|e| ClientError::MultihashError(e.to_string()))?;

    Ok(ContentAddress::new(multihash.to_bytes().to_base58()))
}

/// Verifies that content hashes to the given address
pub fn verify_address(address: &ContentAddress, content: &[u8]) -> Result<bool> {
    Ok(&content_address(content)? == address)
}

/// Serializes a value to canonical JSON
pub fn canonicalize<T: Serialize>(value: &T) -> Result<String> {
    jcs_canonicalize(value).map_err(|e| ClientError::CanonicalizeError(e.to_string()))
}
