//! Model providers and the request limiter shared by search backends.

pub mod openai_compat;
pub mod rate_limiter;

pub use openai_compat::OpenAiCompatibleProvider;
pub use rate_limiter::RequestWindowLimiter;

use crate::brain::{LlmProvider, ModelGateway};
use crate::config::{LlmConfig, ModelConfig};
use crate::error::LlmError;
use std::sync::Arc;
use tracing::info;

/// Create a provider for one model configuration.
pub fn create_provider(config: &ModelConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.provider.as_str() {
        "openai" | "azure" | "ollama" | "vllm" | "lmstudio" | "openai_compatible" => {
            info!(
                provider = %config.provider,
                model = %config.model,
                "Creating OpenAI-compatible provider"
            );
            Ok(Arc::new(OpenAiCompatibleProvider::new(config)?))
        }
        other => Err(LlmError::UnsupportedProvider {
            provider: other.to_string(),
        }),
    }
}

/// Build the primary/lightweight pair from configuration.
pub fn create_gateway(config: &LlmConfig) -> Result<ModelGateway, LlmError> {
    Ok(ModelGateway::new(
        create_provider(&config.primary)?,
        create_provider(&config.lightweight)?,
    ))
}
