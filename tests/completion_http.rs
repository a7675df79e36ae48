//! Classifier client over HTTP against a mock chat-completions endpoint.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mailtriage::error::AppError;
use mailtriage::llm::{ClassifierClient, Completion, HttpCompletionTransport, RetryConfig};

fn classifier(server: &MockServer) -> ClassifierClient<HttpCompletionTransport> {
    let transport = HttpCompletionTransport::new(
        format!("{}/v1/chat/completions", server.uri()),
        "xai-test-key",
    );
    ClassifierClient::new(
        transport,
        RetryConfig {
            max_attempts: 3,
            backoff_unit: Duration::from_millis(5),
            attempt_timeout: Duration::from_secs(5),
        },
    )
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn sends_low_temperature_non_streaming_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer xai-test-key"))
        .and(body_json(json!({
            "model": "grok-4",
            "messages": [
                {"role": "system", "content": "Classify."},
                {"role": "user", "content": "Subject: Plan"}
            ],
            "max_tokens": 50,
            "temperature": 0.2,
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(" Work \n")))
        .expect(1)
        .mount(&server)
        .await;

    let category = classifier(&server)
        .classify_or_generate("Classify.", "Subject: Plan", "grok-4", 50)
        .await
        .expect("classify");
    assert_eq!(category.as_deref(), Some("Work"));
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Spam")))
        .expect(1)
        .mount(&server)
        .await;

    let category = classifier(&server)
        .classify_or_generate("Classify.", "Subject: Prize", "grok-4", 50)
        .await
        .expect("third attempt succeeds");
    assert_eq!(category.as_deref(), Some("Spam"));
}

#[tokio::test]
async fn exhausted_retries_carry_last_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "Incorrect API key provided"
        })))
        .expect(3)
        .mount(&server)
        .await;

    let err = classifier(&server)
        .classify_or_generate("Classify.", "Subject: Plan", "grok-4", 50)
        .await
        .expect_err("all attempts fail");

    match err {
        AppError::Classification(message) => {
            assert!(message.contains("3 attempts"));
            assert!(message.contains("Incorrect API key provided"));
        }
        other => panic!("expected classification error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_are_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .expect(1)
        .mount(&server)
        .await;

    let category = classifier(&server)
        .classify_or_generate("Classify.", "Subject: ?", "grok-4", 50)
        .await
        .expect("well-formed response");
    assert_eq!(category, None);
}
