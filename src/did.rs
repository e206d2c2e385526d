//! DID parsing and formatting.
//!
//! A Sidetree DID is `<namespace>:<unique-suffix>`, where the namespace may
//! itself contain colons (`did:bloc:trustbloc.dev`). Parsing therefore needs
//! the registry of known namespaces. A DID may carry its create payload as
//! `;initial-values=<encoded payload>` so it can be resolved before anchoring.

use std::fmt;

use crate::config::NamespaceRegistry;
use crate::error::{ClientError, Result};

/// Separator between the namespace and the unique suffix
pub const NAMESPACE_DELIMITER: char = ':';

/// Parameter carrying the encoded create payload
pub const INITIAL_VALUES_PARAM: &str = ";initial-values=";

/// Represents a parsed Sidetree DID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidetreeDid {
    /// The namespace the DID belongs to
    pub namespace: String,
    /// The unique suffix derived from the create payload
    pub unique_suffix: String,
    /// Optional encoded create payload
    pub initial_values: Option<String>,
}

impl SidetreeDid {
    /// Creates a new SidetreeDid instance
    pub fn new(namespace: String, unique_suffix: String) -> Self {
        Self {
            namespace,
            unique_suffix,
            initial_values: None,
        }
    }

    /// Returns a copy carrying the given initial values
    pub fn with_initial_values(mut self, encoded_payload: String) -> Self {
        self.initial_values = Some(encoded_payload);
        self
    }

    /// The DID without any parameters
    pub fn did(&self) -> String {
        format!("{}{}{}", self.namespace, NAMESPACE_DELIMITER, self.unique_suffix)
    }

    /// Parses and validates a DID against the registered namespaces
    pub fn parse(did: &str, registry: &NamespaceRegistry) -> Result<Self> {
        if !did.starts_with("did:") {
            return Err(ClientError::InvalidDidFormat(did.to_string()));
        }

        let (did_part, initial_values) = match did.split_once(INITIAL_VALUES_PARAM) {
            Some((d, values)) if !values.is_empty() => (d, Some(values.to_string())),
            Some(_) => return Err(ClientError::InvalidDidFormat(did.to_string())),
            None => (did, None),
        };

        let namespace = registry.namespace_of(did_part).ok_or_else(|| {
            let ns = did_part
                .rsplit_once(NAMESPACE_DELIMITER)
                .map(|(ns, _)| ns)
                .unwrap_or(did_part);
            ClientError::InvalidNamespace(ns.to_string())
        })?;

        let suffix = &did_part[namespace.namespace.len() + 1..];
        if suffix.is_empty() || suffix.contains(NAMESPACE_DELIMITER) {
            return Err(ClientError::InvalidDidFormat(did.to_string()));
        }

        Ok(Self {
            namespace: namespace.namespace.clone(),
            unique_suffix: suffix.to_string(),
            initial_values,
        })
    }
}

impl fmt::Display for SidetreeDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.did())?;
        if let Some(values) = &self.initial_values {
            write!(f, "{}{}", INITIAL_VALUES_PARAM, values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, NamespaceConfig, ProtocolParameters};

    fn registry() -> NamespaceRegistry {
        let mut namespaces = ClientConfig::default().namespaces;
        namespaces.push(NamespaceConfig {
            namespace: "did:bloc:trustbloc.dev".to_string(),
            base_path: "/trustbloc.dev".to_string(),
            protocols: vec![ProtocolParameters::default()],
        });
        NamespaceRegistry::new(namespaces).unwrap()
    }

    #[test]
    fn test_sidetree_did_parsing() {
        let test_cases = vec![
            ("did:sidetree:EiAbc123", ("did:sidetree", "EiAbc123", None)),
            (
                "did:bloc:trustbloc.dev:EiAbc123",
                ("did:bloc:trustbloc.dev", "EiAbc123", None),
            ),
            (
                "did:sidetree:EiAbc123;initial-values=eyJ9",
                ("did:sidetree", "EiAbc123", Some("eyJ9")),
            ),
        ];

        let registry = registry();
        for (input, expected) in test_cases {
            let parsed = SidetreeDid::parse(input, &registry).unwrap();
            assert_eq!(parsed.namespace, expected.0);
            assert_eq!(parsed.unique_suffix, expected.1);
            assert_eq!(parsed.initial_values, expected.2.map(String::from));
            assert_eq!(parsed.to_string(), input);
        }
    }

    #[test]
    fn test_invalid_did_format() {
        let registry = registry();
        let invalid_dids = vec![
            "sidetree:EiAbc123",
            "did:sidetree:",
            "did:sidetree:Ei:Abc",
            "did:sidetree:EiAbc123;initial-values=",
        ];

        for did in invalid_dids {
            assert!(
                matches!(SidetreeDid::parse(did, &registry), Err(ClientError::InvalidDidFormat(_))),
                "{did} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_namespace() {
        let registry = registry();
        assert!(matches!(
            SidetreeDid::parse("did:other:EiAbc123", &registry),
            Err(ClientError::InvalidNamespace(ns)) if ns == "did:other"
        ));
    }
}
