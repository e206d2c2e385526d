//! Client configuration and the namespace registry.
//!
//! Configuration priority (highest wins):
//! 1. Config file (TOML)
//! 2. Environment variables (`SIDETREE_` prefix, `__` separates nested keys)
//! 3. Defaults

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::verification::SHA2_256;

/// Namespace registered by default
pub const DEFAULT_NAMESPACE: &str = "did:sidetree";

/// REST base path of the default namespace
pub const DEFAULT_BASE_PATH: &str = "/document";

/// Complete client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout applied to every REST request, in seconds.
    pub request_timeout_secs: u64,

    /// Namespaces the client may build requests for.
    pub namespaces: Vec<NamespaceConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            namespaces: vec![NamespaceConfig {
                namespace: DEFAULT_NAMESPACE.to_string(),
                base_path: DEFAULT_BASE_PATH.to_string(),
                protocols: vec![ProtocolParameters::default()],
            }],
        }
    }
}

impl ClientConfig {
    /// Load configuration from defaults, environment, and an optional config file.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(ClientConfig::default()))
            .merge(Env::prefixed("SIDETREE_").split("__"));

        if let Some(path) = config_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        Ok(figment.extract()?)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validates the namespaces and builds the registry used by the client
    pub fn registry(&self) -> Result<NamespaceRegistry> {
        NamespaceRegistry::new(self.namespaces.clone())
    }
}

/// Configuration of a single DID namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// The namespace, e.g. `did:sidetree`
    pub namespace: String,

    /// REST base path serving the namespace, e.g. `/document`
    pub base_path: String,

    /// Protocol versions, each in force from its starting blockchain time
    pub protocols: Vec<ProtocolParameters>,
}

impl NamespaceConfig {
    /// Returns the protocol in force at the given blockchain time
    pub fn protocol_at(&self, blockchain_time: u64) -> Result<&ProtocolParameters> {
        self.protocols
            .iter()
            .filter(|p| p.starting_blockchain_time <= blockchain_time)
            .max_by_key(|p| p.starting_blockchain_time)
            .ok_or_else(|| {
                ClientError::InvalidNamespace(format!(
                    "{} has no protocol at blockchain time {}",
                    self.namespace, blockchain_time
                ))
            })
    }

    /// Returns the most recent protocol version
    pub fn current_protocol(&self) -> Result<&ProtocolParameters> {
        self.protocol_at(u64::MAX)
    }

    fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() || !self.namespace.starts_with("did:") {
            return Err(ClientError::Config(format!(
                "namespace '{}' must start with 'did:'",
                self.namespace
            )));
        }
        if self.protocols.is_empty() {
            return Err(ClientError::Config(format!(
                "namespace {} has no protocol versions",
                self.namespace
            )));
        }
        for protocol in &self.protocols {
            if protocol.hash_algorithm_in_multihash_code != SHA2_256 {
                return Err(ClientError::Config(format!(
                    "namespace {}: unsupported multihash code {}",
                    self.namespace, protocol.hash_algorithm_in_multihash_code
                )));
            }
            if protocol.max_operations_per_batch == 0 || protocol.max_operation_byte_size == 0 {
                return Err(ClientError::Config(format!(
                    "namespace {}: protocol limits must be positive",
                    self.namespace
                )));
            }
        }
        Ok(())
    }
}

/// Parameters of one Sidetree protocol version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    /// Blockchain time from which this version is in force
    pub starting_blockchain_time: u64,

    /// Multihash code of the hash algorithm used for content addresses
    pub hash_algorithm_in_multihash_code: u64,

    /// Maximum size of an encoded operation payload
    pub max_operation_byte_size: usize,

    /// Maximum number of operations in a batch file
    pub max_operations_per_batch: usize,
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        Self {
            starting_blockchain_time: 0,
            hash_algorithm_in_multihash_code: SHA2_256,
            max_operation_byte_size: 2000,
            max_operations_per_batch: 10,
        }
    }
}

/// Registered namespaces, populated once at startup
#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    namespaces: HashMap<String, NamespaceConfig>,
}

impl NamespaceRegistry {
    /// Builds a registry, rejecting invalid or duplicate namespaces
    pub fn new(namespaces: Vec<NamespaceConfig>) -> Result<Self> {
        let mut registry = HashMap::new();
        for ns in namespaces {
            ns.validate()?;
            debug!(namespace = %ns.namespace, base_path = %ns.base_path, "registering namespace");
            if let Some(existing) = registry.insert(ns.namespace.clone(), ns) {
                return Err(ClientError::Config(format!(
                    "duplicate namespace {}",
                    existing.namespace
                )));
            }
        }
        Ok(Self { namespaces: registry })
    }

    /// Looks up a namespace
    pub fn get(&self, namespace: &str) -> Result<&NamespaceConfig> {
        self.namespaces
            .get(namespace)
            .ok_or_else(|| ClientError::InvalidNamespace(namespace.to_string()))
    }

    /// Finds the longest registered namespace that prefixes the given DID
    pub fn namespace_of(&self, did: &str) -> Option<&NamespaceConfig> {
        self.namespaces
            .values()
            .filter(|ns| {
                did.strip_prefix(ns.namespace.as_str())
                    .is_some_and(|rest| rest.starts_with(':'))
            })
            .max_by_key(|ns| ns.namespace.len())
    }
}
