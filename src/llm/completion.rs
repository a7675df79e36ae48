use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    /// Trimmed content of the first choice, if the service returned one.
    pub fn first_content(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(|content| content.trim().to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// One request/response exchange with a chat-completions service.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> AppResult<ChatResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpCompletionTransport {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl HttpCompletionTransport {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl CompletionTransport for HttpCompletionTransport {
    async fn send(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_completion_error(status, &body))
    }
}

#[derive(Debug, Deserialize)]
struct CompletionErrorEnvelope {
    error: CompletionErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompletionErrorBody {
    Detailed { message: Option<String> },
    Text(String),
}

fn map_completion_error(status: StatusCode, body: &str) -> AppError {
    let detail = serde_json::from_str::<CompletionErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| match envelope.error {
            CompletionErrorBody::Detailed { message } => message,
            CompletionErrorBody::Text(text) => Some(text),
        })
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                "no error details in response body".to_string()
            } else {
                body.to_string()
            }
        });

    AppError::Api(format!("completion api request failed ({status}): {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_content_is_trimmed() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Work\n"}}]}"#,
        )
        .expect("parse");
        assert_eq!(response.first_content().as_deref(), Some("Work"));
    }

    #[test]
    fn missing_choices_yield_no_content() {
        let response: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).expect("parse");
        assert_eq!(response.first_content(), None);
    }

    #[test]
    fn extracts_structured_error_message() {
        let error = map_completion_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"model not found","type":"invalid_request_error"}}"#,
        );
        match error {
            AppError::Api(message) => assert!(message.contains("model not found")),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_raw_error_body() {
        let error = map_completion_error(StatusCode::BAD_GATEWAY, "upstream unavailable");
        match error {
            AppError::Api(message) => {
                assert!(message.contains("502"));
                assert!(message.contains("upstream unavailable"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn string_error_field_is_used() {
        let error = map_completion_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":"Incorrect API key provided"}"#,
        );
        assert!(error.to_string().contains("Incorrect API key provided"));
    }
}
