use std::net::SocketAddr;
use std::time::Duration;

use config::{Config, Environment};
use maestro::agents::{BuiltinConfig, SearchConfig};
use maestro::engine::EngineConfig;
use maestro::orchestrator::DEFAULT_MAX_ITERATIONS;
use maestro::providers::configs::{
    AnthropicProviderConfig, OpenAiProviderConfig, ProviderConfig, ANTHROPIC_HOST,
    ANTHROPIC_MAX_TOKENS, ANTHROPIC_MODEL, DEFAULT_TIMEOUT, OPENAI_HOST, OPENAI_MODEL,
};
use maestro::providers::factory::ProviderType;
use serde::Deserialize;

use crate::error::{missing_field_path, to_env_var, ConfigError};

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    Anthropic {
        #[serde(default = "default_anthropic_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_anthropic_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default = "default_anthropic_max_tokens")]
        max_tokens: Option<i32>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
            ProviderSettings::Anthropic { .. } => ProviderType::Anthropic,
        }
    }

    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
                timeout_secs,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
                timeout: Duration::from_secs(timeout_secs),
            }),
            ProviderSettings::Anthropic {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
                timeout_secs,
            } => ProviderConfig::Anthropic(AnthropicProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
                timeout: Duration::from_secs(timeout_secs),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrchestrationSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for OrchestrationSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_search_host")]
    pub host: String,
    pub api_key: String,
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    /// Tried first for every run
    pub primary: ProviderSettings,
    /// Takes over when the primary provider fails
    #[serde(default)]
    pub secondary: Option<ProviderSettings>,
    #[serde(default)]
    pub orchestration: OrchestrationSettings,
    #[serde(default)]
    pub search: Option<SearchSettings>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("orchestration.max_iterations", default_max_iterations() as u64)?
            .add_source(
                Environment::with_prefix("MAESTRO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let Some(field) = missing_field_path(&err.to_string()) {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }

    /// Split into the listener settings and the engine config, providers in priority order
    pub fn into_engine_config(self) -> (ServerSettings, EngineConfig) {
        let mut providers = vec![self.primary.into_config()];
        if let Some(secondary) = self.secondary {
            providers.push(secondary.into_config());
        }

        let builtin = BuiltinConfig {
            search: self.search.map(|search| {
                let mut config = SearchConfig::new(search.api_key);
                config.host = search.host;
                config.max_results = search.max_results;
                config
            }),
            ..BuiltinConfig::default()
        };

        let engine = EngineConfig {
            providers,
            max_iterations: self.orchestration.max_iterations,
            builtin,
        };
        (self.server, engine)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_openai_model() -> String {
    OPENAI_MODEL.to_string()
}

fn default_anthropic_host() -> String {
    ANTHROPIC_HOST.to_string()
}

fn default_anthropic_model() -> String {
    ANTHROPIC_MODEL.to_string()
}

fn default_anthropic_max_tokens() -> Option<i32> {
    Some(ANTHROPIC_MAX_TOKENS)
}

fn default_search_host() -> String {
    maestro::agents::general::SEARCH_HOST.to_string()
}

fn default_search_max_results() -> usize {
    maestro::agents::general::SEARCH_MAX_RESULTS
}
