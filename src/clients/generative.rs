use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Tagged failure for a single generative-service call. Both variants are
/// retryable; the caller decides the budget.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("response failed schema validation: {0}")]
    Schema(String),
    #[error("generative service transport failure: {0}")]
    Transport(String),
}

/// Black-box generative text service. `complete` returns free text;
/// `complete_json` must return a single JSON object. Structured calls go
/// through [`generate_structured`], which keeps this trait object-safe.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn complete(&self, message: &str) -> Result<String, GenerateError>;
    async fn complete_json(&self, message: &str) -> Result<serde_json::Value, GenerateError>;
}

/// Ask for a response conforming to `T`, treating any parse failure as a
/// schema error. `schema_hint` describes the expected shape to the model.
pub async fn generate_structured<T: DeserializeOwned>(
    client: &dyn GenerativeClient,
    message: &str,
    schema_hint: &str,
) -> Result<T, GenerateError> {
    let prompt = format!(
        "{message}\n\nRespond with a single JSON object. {schema_hint}"
    );
    let value = client.complete_json(&prompt).await?;
    serde_json::from_value(value.clone()).map_err(|e| {
        error!("schema validation failed: {e}; response: {value}");
        GenerateError::Schema(e.to_string())
    })
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    const JSON_SYSTEM_MSG: &'static str =
        "You are a helpful assistant designed to output JSON.";

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    async fn chat(
        &self,
        system: Option<&str>,
        user: &str,
        json_mode: bool,
    ) -> Result<String, GenerateError> {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
            response_format: json_mode
                .then(|| serde_json::json!({ "type": "json_object" })),
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerateError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Truncate on char boundaries; error pages are not always ASCII.
            let preview: String = body.chars().take(500).collect();
            return Err(GenerateError::Transport(format!("status {status}: {preview}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Transport(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerateError::Transport("no completion choices".to_string()))
    }
}

#[async_trait]
impl GenerativeClient for OpenAiClient {
    async fn complete(&self, message: &str) -> Result<String, GenerateError> {
        self.chat(None, message, false).await
    }

    async fn complete_json(&self, message: &str) -> Result<serde_json::Value, GenerateError> {
        let content = self
            .chat(Some(Self::JSON_SYSTEM_MSG), message, true)
            .await?;
        serde_json::from_str(&content).map_err(|e| GenerateError::Schema(e.to_string()))
    }
}
