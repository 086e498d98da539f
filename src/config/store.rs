use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::mongodb_store::MongoDBConfig;

/// A wrapper for the store configuration:
/// - timeout_in_secs: upper bound for every single store call.
/// - backend: the actual store backend (MongoDB or in-memory).
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct StoreConfig {
    #[serde(default = "default_timeout_in_secs")]
    pub timeout_in_secs: u64,
    #[serde(flatten)]
    pub backend: StoreBackend,
}

fn default_timeout_in_secs() -> u64 {
    100
}

/// The existing store backends. We differentiate them via a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(tag = "type")]
pub enum StoreBackend {
    #[serde(rename = "mongo")]
    MongoDB(MongoDBConfig),
    /// Process-local store, lost on restart. Used by tests and local runs.
    #[serde(rename = "memory")]
    Memory,
}
