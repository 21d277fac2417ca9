pub mod gemini;
pub mod guarded;
pub mod local;
pub mod traits;

use std::sync::Arc;

pub use gemini::GeminiClient;
pub use guarded::GuardedModel;
pub use local::OpenAiCompatClient;
pub use traits::{LanguageModel, ModelError, ModelRequest, ModelResponse};

use crate::config::Config;
use crate::error::{AbleMindError, Result};

/// Build the process-wide model handle from configuration.
///
/// Called once by each entry point; the returned handle is passed down
/// explicitly to every component that talks to the model.
pub fn create_model(config: &Config) -> Result<GuardedModel> {
    let timeout_ms = config.model.timeout_ms;
    let inner: Arc<dyn LanguageModel> = match config.model.provider.as_str() {
        "gemini" => Arc::new(
            GeminiClient::new(
                config.runtime.api_key.clone().unwrap_or_default(),
                Some(config.model.model.clone()),
                config.model.base_url.clone(),
                timeout_ms,
            )
            .map_err(model_err)?,
        ),
        "openai" => Arc::new(
            OpenAiCompatClient::new(
                config.model.base_url.clone(),
                config.model.model.clone(),
                config.runtime.api_key.clone(),
                timeout_ms,
            )
            .map_err(model_err)?,
        ),
        other => {
            return Err(AbleMindError::Config {
                message: format!("Unknown model provider '{}'", other),
            });
        }
    };

    tracing::info!(
        "Model client initialized: {} (timeout {}ms)",
        inner.name(),
        timeout_ms
    );
    Ok(GuardedModel::new(inner, timeout_ms))
}

fn model_err(err: ModelError) -> AbleMindError {
    match err {
        ModelError::MissingApiKey(provider) => AbleMindError::Config {
            message: format!("API key required for provider '{}'", provider),
        },
        other => AbleMindError::Model {
            message: other.to_string(),
        },
    }
}
