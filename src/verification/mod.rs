//! Hashing and verification functionality.
//!
//! This module provides content addressing for channel writes and the pure
//! checks used to verify responses, written content and version counts.

mod address;
mod response;

pub use address::{canonicalize, content_address, verify_address};
pub use response::{
    content_matches, error_response_contains, success_response_contains, version_count_matches,
};

/// Multihash code of sha2-256, the only supported hash algorithm
pub const SHA2_256: u64 = 0x12;
