//! Perplexity chat completions client
//!
//! OpenAI-compatible request shape: a system and a user message, answer taken
//! from the first choice.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::generation::Prompt;
use crate::providers::llm::LlmProvider;

/// Perplexity LLM provider
pub struct PerplexityClient {
    client: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl PerplexityClient {
    /// Create a new client.
    ///
    /// A missing API key is not an error here; it is reported on the first
    /// completion so retrieval-only deployments can still start.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(serde::Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(serde::Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(serde::Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(serde::Deserialize)]
struct ResponseMessage {
    content: String,
}

#[async_trait]
impl LlmProvider for PerplexityClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::config("PERPLEXITY_API_KEY is not set"))?;

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Perplexity request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!(
                "Perplexity API error ({}): {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("Failed to parse Perplexity response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Llm("No choices in Perplexity response".to_string()))
    }

    fn name(&self) -> &str {
        "perplexity"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::PromptBuilder;
    use serde_json::json;
    use wiremock::matchers::{any, body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(str::to_string),
            api_url: format!("{}/chat/completions", server.uri()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_complete_sends_system_and_user_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer pplx-test"))
            .and(body_json(json!({
                "model": "sonar",
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant. Answer questions clearly and concisely."},
                    {"role": "user", "content": "What is Rust?"}
                ],
                "temperature": 0.7,
                "max_tokens": 1024
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "abc",
                "model": "sonar",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "A systems language."}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PerplexityClient::new(&config(&server, Some("pplx-test"))).unwrap();
        let answer = client
            .complete(&PromptBuilder::build_simple_prompt("What is Rust?"))
            .await
            .unwrap();
        assert_eq!(answer, "A systems language.");
        assert_eq!(client.model(), "sonar");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = PerplexityClient::new(&config(&server, None)).unwrap();
        let err = client
            .complete(&PromptBuilder::build_simple_prompt("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_upstream_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = PerplexityClient::new(&config(&server, Some("bad"))).unwrap();
        let err = client
            .complete(&PromptBuilder::build_simple_prompt("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("invalid api key"));
    }
}
