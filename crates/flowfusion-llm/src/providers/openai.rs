use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use flowfusion_core::config::ModelConfig;
use flowfusion_core::error::{FlowError, Result};
use flowfusion_core::traits::Generator;
use flowfusion_core::types::ChatMessage;

use super::presets::get_preset;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const COMPLETIONS_PATH: &str = "/chat/completions";

/// OpenAI-compatible client. Works with OpenAI, Ollama, vLLM, Groq, OpenRouter, etc.
pub struct OpenAiGenerator {
    http: Client,
    config: ModelConfig,
    api_key: Option<String>,
    endpoint: String,
    extra_headers: Vec<(String, String)>,
}

impl OpenAiGenerator {
    pub fn new(config: ModelConfig, api_key: Option<String>) -> Self {
        let preset = get_preset(&config.provider);
        let endpoint = config
            .base_url
            .as_deref()
            .map(completions_endpoint)
            .or_else(|| preset.as_ref().map(|p| p.default_base_url.to_string()))
            .unwrap_or_else(|| OPENAI_API_URL.to_string());
        let extra_headers = preset
            .map(|p| {
                p.extra_headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            http: Client::new(),
            config,
            api_key,
            endpoint,
            extra_headers,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// `base` plus `/chat/completions`, unless `base` already names the endpoint.
fn completions_endpoint(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with(COMPLETIONS_PATH) {
        base.to_string()
    } else {
        format!("{}{}", base, COMPLETIONS_PATH)
    }
}

// Request types
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

// Response types
#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first choice's message text out of a completion response body.
pub(crate) fn parse_completion(body: &str) -> Result<String> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| FlowError::LlmParse(e.to_string()))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| FlowError::LlmParse("response contained no choices".into()))?;

    Ok(choice.message.content.unwrap_or_default())
}

impl Generator for OpenAiGenerator {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> BoxFuture<'_, Result<String>> {
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_prompt),
        ];

        Box::pin(async move {
            let body = ChatRequest {
                model: &self.config.model_id,
                messages,
                max_tokens: self.config.max_tokens,
                temperature: if self.config.temperature > 0.0 {
                    Some(self.config.temperature)
                } else {
                    None
                },
                stream: false,
            };

            let mut req = self.http.post(&self.endpoint).json(&body);

            if let Some(api_key) = &self.api_key {
                req = req.bearer_auth(api_key);
            }

            for (k, v) in &self.extra_headers {
                req = req.header(k.as_str(), v.as_str());
            }

            debug!(model = %self.config.model_id, endpoint = %self.endpoint, "Sending completion request");

            let response = req
                .send()
                .await
                .map_err(|e| FlowError::LlmRequest(e.to_string()))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| FlowError::LlmRequest(e.to_string()))?;

            if !status.is_success() {
                return Err(FlowError::LlmRequest(format!("HTTP {}: {}", status, text)));
            }

            parse_completion(&text)
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
            || get_preset(&self.config.provider).is_some_and(|p| !p.needs_api_key)
    }
}
