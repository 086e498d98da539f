use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::store::{StoreBackend, StoreConfig};
use crate::error::ConfigError;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// When set (e.g. from `PORT`), the server listens on `0.0.0.0:<port>`
    /// instead of `bind_address`.
    #[serde(default)]
    pub port: Option<u16>,
    pub store: StoreConfig,
    pub jwt: JWTConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

impl ConfigV1 {
    /// The socket address the server binds to.
    pub fn listen_address(&self) -> String {
        match self.port {
            Some(port) => format!("0.0.0.0:{}", port),
            None => self.bind_address.clone(),
        }
    }

    /// Refuses configurations the server cannot safely start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if let StoreBackend::MongoDB(mongo) = &self.store.backend {
            if mongo.uri.trim().is_empty() {
                return Err(ConfigError::MissingStoreUri);
            }
        }
        Ok(())
    }
}

/// Token signing settings.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct JWTConfig {
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_access_ttl_hours")]
    pub access_ttl_hours: i64,
    #[serde(default = "default_refresh_ttl_hours")]
    pub refresh_ttl_hours: i64,
}

fn default_access_ttl_hours() -> i64 {
    24
}

fn default_refresh_ttl_hours() -> i64 {
    168
}

/// Layers environment overrides on top of `base`:
/// - `STOREFRONT_<SECTION>__<KEY>` for any field,
/// - `PORT`, `SECRET_KEY` and `MONGODB_URI` as shorthands.
pub fn with_env_overrides(base: Figment) -> Figment {
    Figment::new()
        .merge(Serialized::default("version", "1.0.0"))
        .merge(base)
        .merge(Env::prefixed("STOREFRONT_").split("__"))
        .merge(Env::raw().only(&["PORT"]).map(|_| "port".into()))
        .merge(Env::raw().only(&["SECRET_KEY"]).map(|_| "jwt.secret".into()))
        .merge(Env::raw().only(&["MONGODB_URI"]).map(|_| "store.uri".into()))
}

/// Extracts and validates a configuration from an assembled figment.
pub fn extract_config(figment: &Figment) -> Result<ConfigV1, ConfigError> {
    let config = match figment.extract::<Config>().map_err(Box::new)? {
        Config::ConfigV1(c) => c,
    };
    // handle configuration migration between versions here when necessary
    config.validate()?;
    Ok(config)
}

/// Load config from "config.yaml" in the current directory plus environment overrides.
pub fn load_config() -> Result<ConfigV1, ConfigError> {
    extract_config(&with_env_overrides(
        Figment::new().merge(Yaml::file("./config.yaml")),
    ))
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
