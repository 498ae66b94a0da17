use std::sync::Arc;

use super::{
    anthropic::AnthropicProvider, base::Provider, configs::ProviderConfig, errors::ProviderResult,
    openai::OpenAiProvider,
};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    OpenAi,
    Anthropic,
}

impl ProviderConfig {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderConfig::OpenAi(_) => ProviderType::OpenAi,
            ProviderConfig::Anthropic(_) => ProviderType::Anthropic,
        }
    }
}

pub fn get_provider(config: ProviderConfig) -> ProviderResult<Arc<dyn Provider>> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Arc::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Anthropic(anthropic_config) => {
            Ok(Arc::new(AnthropicProvider::new(anthropic_config)?))
        }
    }
}

/// Build providers in priority order: the first entry is tried first
pub fn get_providers(configs: Vec<ProviderConfig>) -> ProviderResult<Vec<Arc<dyn Provider>>> {
    configs.into_iter().map(get_provider).collect()
}
