//! Response verification.
//!
//! Pure comparisons between expected and actual results. None of these
//! functions touch the network or the ledger.

use crate::transport::HttpResponse;
use crate::types::DocumentVersion;

/// Returns true if the response succeeded and its body contains `expected`
pub fn success_response_contains(response: &HttpResponse, expected: &str) -> bool {
    response.is_success() && response.body.contains(expected)
}

/// Returns true if the response failed and its body contains `expected`
pub fn error_response_contains(response: &HttpResponse, expected: &str) -> bool {
    !response.is_success() && response.body.contains(expected)
}

/// Returns true if content read back from a channel equals the original
pub fn content_matches(original: &[u8], read: &[u8]) -> bool {
    original == read
}

/// Returns true if a query returned exactly `expected` versions
pub fn version_count_matches(expected: usize, versions: &[DocumentVersion]) -> bool {
    versions.len() == expected
}
