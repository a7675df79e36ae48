//! Completion calls with bounded retry, used both to classify messages and
//! to generate reply drafts.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

use super::completion::{ChatMessage, ChatRequest, CompletionTransport};

/// Low sampling temperature keeps categorical answers stable.
pub const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Delay after failed attempt `n` (0-indexed) is `backoff_unit * 2^n`.
    pub backoff_unit: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

pub fn backoff_delay(unit: Duration, attempt: u32) -> Duration {
    unit.saturating_mul(2_u32.saturating_pow(attempt))
}

#[async_trait]
pub trait Completion: Send + Sync {
    /// Returns the trimmed text of the first choice, or `None` when the
    /// service answered without any choice.
    async fn classify_or_generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        max_tokens: u32,
    ) -> AppResult<Option<String>>;
}

#[derive(Debug, Clone)]
pub struct ClassifierClient<T> {
    transport: T,
    retry: RetryConfig,
}

impl<T: CompletionTransport> ClassifierClient<T> {
    pub fn new(transport: T, retry: RetryConfig) -> Self {
        Self { transport, retry }
    }
}

#[async_trait]
impl<T: CompletionTransport> Completion for ClassifierClient<T> {
    async fn classify_or_generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        max_tokens: u32,
    ) -> AppResult<Option<String>> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
            max_tokens,
            temperature: TEMPERATURE,
            stream: false,
        };

        let attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            let outcome =
                tokio::time::timeout(self.retry.attempt_timeout, self.transport.send(&request))
                    .await;

            match outcome {
                Ok(Ok(response)) => {
                    if attempt > 0 {
                        debug!(attempt, "completion succeeded after retry");
                    }
                    return Ok(response.first_content());
                }
                Ok(Err(err)) => last_error = err.to_string(),
                Err(_) => {
                    last_error = format!(
                        "request timed out after {}s",
                        self.retry.attempt_timeout.as_secs_f32()
                    );
                }
            }

            if attempt + 1 < attempts {
                let delay = backoff_delay(self.retry.backoff_unit, attempt);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "completion request failed; retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(AppError::Classification(format!(
            "completion failed after {attempts} attempts: {last_error}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;
    use crate::llm::completion::{ChatChoice, ChatChoiceMessage, ChatResponse};

    struct ScriptedTransport {
        failures_before_success: u32,
        calls: AtomicU32,
        call_times: Mutex<Vec<Instant>>,
        hang: bool,
    }

    impl ScriptedTransport {
        fn failing(failures_before_success: u32) -> Self {
            Self {
                failures_before_success,
                calls: AtomicU32::new(0),
                call_times: Mutex::new(Vec::new()),
                hang: false,
            }
        }
    }

    #[async_trait]
    impl CompletionTransport for ScriptedTransport {
        async fn send(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
            self.call_times.lock().expect("lock").push(Instant::now());
            let call = self.calls.fetch_add(1, Ordering::SeqCst);

            assert_eq!(request.temperature, TEMPERATURE);
            assert!(!request.stream);
            assert_eq!(request.messages[0].role, "system");
            assert_eq!(request.messages[1].role, "user");

            if self.hang {
                std::future::pending::<()>().await;
            }

            if call < self.failures_before_success {
                return Err(AppError::Api("completion api request failed (503)".to_string()));
            }

            Ok(ChatResponse {
                choices: vec![ChatChoice {
                    message: ChatChoiceMessage {
                        content: Some(" Work ".to_string()),
                    },
                }],
            })
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let unit = Duration::from_secs(1);
        assert_eq!(backoff_delay(unit, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(unit, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(unit, 2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let client = ClassifierClient::new(ScriptedTransport::failing(2), RetryConfig::default());

        let category = client
            .classify_or_generate("classify", "Subject: hi", "grok-4", 50)
            .await
            .expect("third attempt succeeds");

        assert_eq!(category.as_deref(), Some("Work"));
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fails_after_exhausting_attempts_with_exponential_backoff() {
        let client = ClassifierClient::new(ScriptedTransport::failing(u32::MAX), RetryConfig::default());

        let err = client
            .classify_or_generate("classify", "Subject: hi", "grok-4", 50)
            .await
            .expect_err("all attempts fail");

        match err {
            AppError::Classification(message) => {
                assert!(message.contains("3 attempts"));
                assert!(message.contains("503"));
            }
            other => panic!("expected classification error, got {other:?}"),
        }

        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 3);
        let times = client.transport.call_times.lock().expect("lock").clone();
        assert_eq!(times[1] - times[0], Duration::from_secs(1));
        assert_eq!(times[2] - times[1], Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_count_as_failed_attempts() {
        let transport = ScriptedTransport {
            hang: true,
            ..ScriptedTransport::failing(0)
        };
        let client = ClassifierClient::new(transport, RetryConfig::default());

        let started = Instant::now();
        let err = client
            .classify_or_generate("classify", "Subject: hi", "grok-4", 50)
            .await
            .expect_err("every attempt times out");

        assert!(err.to_string().contains("timed out"));
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 3);
        // Three 30s timeouts plus 1s and 2s of backoff.
        assert_eq!(started.elapsed(), Duration::from_secs(93));
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_config_does_not_sleep() {
        let retry = RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        };
        let client = ClassifierClient::new(ScriptedTransport::failing(u32::MAX), retry);

        let started = Instant::now();
        assert!(
            client
                .classify_or_generate("s", "u", "grok-4", 50)
                .await
                .is_err()
        );
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
