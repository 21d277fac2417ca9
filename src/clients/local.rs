//! OpenAI-compatible chat completions client (OpenAI, Groq, llama.cpp, vLLM...)

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::clients::traits::{LanguageModel, ModelError, ModelRequest, ModelResponse};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com";

#[derive(Clone, Debug)]
pub struct OpenAiCompatClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: Option<String>,
        model: String,
        api_key: Option<String>,
        timeout_ms: u64,
    ) -> Result<Self, ModelError> {
        let endpoint = base_url.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        // Ensure endpoint has the correct path if not provided
        let endpoint = if endpoint.ends_with("/chat/completions") {
            endpoint
        } else if endpoint.trim_end_matches('/').ends_with("/v1") {
            format!("{}/chat/completions", endpoint.trim_end_matches('/'))
        } else {
            format!("{}/v1/chat/completions", endpoint.trim_end_matches('/'))
        };

        // Hosted endpoints need a key; local servers usually don't
        if endpoint.starts_with(DEFAULT_ENDPOINT) && api_key.as_deref().is_none_or(str::is_empty) {
            return Err(ModelError::MissingApiKey("openai".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms.saturating_mul(2)))
            .build()
            .map_err(|e| ModelError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            model,
            api_key,
            client,
        })
    }

    fn build_body(&self, request: &ModelRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You respond with a single JSON object and nothing else."},
                {"role": "user", "content": request.prompt}
            ],
        });
        if let Some(t) = request.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(p) = request.top_p {
            body["top_p"] = json!(p);
        }
        if let Some(seed) = request.seed {
            body["seed"] = json!(seed);
        }
        if request.json_output {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatClient {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        let started = Instant::now();
        let mut req = self.client.post(&self.endpoint).json(&self.build_body(request));
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            req = req.bearer_auth(key);
        }

        let res = req.send().await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            return Err(ModelError::Status { status, body: text });
        }

        let response_json: Value = res
            .json()
            .await
            .map_err(|e| ModelError::ParseError(format!("chat completion response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(ModelError::Empty);
        }

        Ok(ModelResponse {
            text: content,
            model: self.model.clone(),
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> String {
        format!("openai:{}", self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalization() {
        let local = OpenAiCompatClient::new(
            Some("http://127.0.0.1:8111/".into()),
            "m".into(),
            None,
            1000,
        )
        .unwrap();
        assert_eq!(local.endpoint, "http://127.0.0.1:8111/v1/chat/completions");

        let groq = OpenAiCompatClient::new(
            Some("https://api.groq.com/openai/v1".into()),
            "m".into(),
            Some("k".into()),
            1000,
        )
        .unwrap();
        assert_eq!(groq.endpoint, "https://api.groq.com/openai/v1/chat/completions");
    }

    #[test]
    fn test_hosted_endpoint_requires_key() {
        let err = OpenAiCompatClient::new(None, "gpt-4o-mini".into(), None, 1000).unwrap_err();
        assert!(matches!(err, ModelError::MissingApiKey(_)));
    }

    #[test]
    fn test_body_carries_seed_and_json_mode() {
        let client =
            OpenAiCompatClient::new(Some("http://localhost:1".into()), "m".into(), None, 1000)
                .unwrap();
        let body = client.build_body(&ModelRequest::json("p").with_seed(7));
        assert_eq!(body["seed"], 7);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("temperature").is_none());
    }
}
