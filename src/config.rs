//! Layered configuration: defaults → TOML file → `RESEARCH_*` environment
//! variables → CLI overrides.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub graceful_shutdown_timeout_secs: u64,
    /// Origins allowed by the CORS layer.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            graceful_shutdown_timeout_secs: 30,
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Tunables for the iterative orchestrator (§4.5 / §5 of the design).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    pub initial_search_query_count: u32,
    pub max_research_loops: u32,
    pub max_parallel_searches: usize,
    pub per_provider_timeout_secs: u64,
    pub batch_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub quality_threshold: f64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            initial_search_query_count: 3,
            max_research_loops: 2,
            max_parallel_searches: 8,
            per_provider_timeout_secs: 10,
            batch_timeout_secs: 30,
            request_timeout_secs: 120,
            quality_threshold: 0.0,
        }
    }
}

/// Per-provider keys/endpoint overrides. Missing keys disable that provider,
/// never the whole service (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub llm_api_key: Option<String>,
    pub custom_search_api_key: Option<String>,
    pub custom_search_engine_id: Option<String>,
    pub secondary_search_api_key: Option<String>,
    pub secondary_search_engine: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub profile: String,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub research: ResearchConfig,
    pub providers: ProvidersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: "development".to_string(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            research: ResearchConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

/// Overrides sourced from CLI flags, applied last and highest-precedence.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server_port: Option<u16>,
    pub server_host: Option<String>,
    pub log_level: Option<String>,
    pub profile: Option<String>,
}

impl Config {
    /// Load defaults, overlay an optional TOML file, then overlay
    /// `RESEARCH_*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, Error> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let built = builder
            .add_source(config::Environment::with_prefix("RESEARCH").separator("__"))
            .build()?;

        let mut cfg: Self = built.try_deserialize()?;
        cfg.apply_envy_overlay();
        Ok(cfg)
    }

    /// Load from a specific TOML file, failing if absent or malformed.
    pub fn load_from_file(path: &PathBuf) -> Result<Self, Error> {
        let built = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path.as_path()))
            .build()?;
        Ok(built.try_deserialize()?)
    }

    /// API keys are more naturally read from plain environment variables
    /// (`LLM_API_KEY`, etc.) than from the nested `RESEARCH__*` scheme; apply
    /// that overlay here via `envy`.
    fn apply_envy_overlay(&mut self) {
        if let Ok(providers) = envy::prefixed("RESEARCH_PROVIDER_").from_env::<ProvidersConfig>() {
            if providers.llm_api_key.is_some() {
                self.providers.llm_api_key = providers.llm_api_key;
            }
            if providers.custom_search_api_key.is_some() {
                self.providers.custom_search_api_key = providers.custom_search_api_key;
            }
            if providers.custom_search_engine_id.is_some() {
                self.providers.custom_search_engine_id = providers.custom_search_engine_id;
            }
            if providers.secondary_search_api_key.is_some() {
                self.providers.secondary_search_api_key = providers.secondary_search_api_key;
            }
            if providers.secondary_search_engine.is_some() {
                self.providers.secondary_search_engine = providers.secondary_search_engine;
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(ref host) = overrides.server_host {
            self.server.host = host.clone();
        }
        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
        if let Some(ref profile) = overrides.profile {
            self.profile = profile.clone();
        }
    }

    /// Validate cross-field invariants not expressible in the type system.
    pub fn validate(&self) -> Result<(), Error> {
        if self.server.port == 0 {
            return Err(Error::Validation {
                field: "server.port".to_string(),
                reason: "port must be between 1 and 65535".to_string(),
            });
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(Error::Validation {
                field: "logging.level".to_string(),
                reason: format!("must be one of {valid_levels:?}"),
            });
        }
        if self.research.initial_search_query_count == 0 {
            return Err(Error::Validation {
                field: "research.initial_search_query_count".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if self.providers.llm_api_key.is_none() {
            return Err(Error::Validation {
                field: "providers.llm_api_key".to_string(),
                reason: "the grounded LLM provider requires an API key".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_research_tunables() {
        let config = Config::default();
        assert_eq!(config.research.initial_search_query_count, 3);
        assert_eq!(config.research.max_research_loops, 2);
    }

    #[test]
    fn validate_rejects_zero_port() {
        let mut config = Config::default();
        config.providers.llm_api_key = Some("key".to_string());
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_missing_llm_key() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_apply_in_precedence_order() {
        let mut config = Config::default();
        let overrides = ConfigOverrides {
            server_port: Some(9090),
            server_host: Some("0.0.0.0".to_string()),
            log_level: None,
            profile: None,
        };
        config.apply_overrides(&overrides);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
    }
}
