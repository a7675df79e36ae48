pub mod classifier;
pub mod completion;

pub use classifier::{ClassifierClient, Completion, RetryConfig, backoff_delay};
pub use completion::{ChatRequest, ChatResponse, CompletionTransport, HttpCompletionTransport};
