pub mod providers;
pub mod retry;

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{info, warn};

use flowfusion_core::config::ModelConfig;
use flowfusion_core::error::{FlowError, Result};
use flowfusion_core::traits::Generator;

pub use providers::openai::OpenAiGenerator;
pub use retry::RetryingGenerator;

/// Stand-in used when no credential is provisioned.
///
/// Reports `is_configured() == false`; calling `complete` is a programming error
/// surfaced as a config failure rather than a network call.
pub struct UnconfiguredGenerator;

impl Generator for UnconfiguredGenerator {
    fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> BoxFuture<'_, Result<String>> {
        Box::pin(async {
            Err(FlowError::Config(
                "generation service has no credential configured".into(),
            ))
        })
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Create the generation collaborator for `config`.
pub fn create_generator(config: &ModelConfig) -> Arc<dyn Generator> {
    let client = OpenAiGenerator::new(config.clone(), config.resolved_api_key());
    if !client.is_configured() {
        warn!(
            provider = %config.provider,
            "No API key found; workflow runs will return the setup advisory"
        );
        return Arc::new(UnconfiguredGenerator);
    }

    info!(provider = %config.provider, model = %config.model_id, "Generation client ready");
    let retry_config = config.retry.clone().unwrap_or_default();
    Arc::new(RetryingGenerator::new(Box::new(client), retry_config))
}
